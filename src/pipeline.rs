//! Video analysis sessions.
//!
//! [`VideoAnalyzer`] is a factory: it holds the detector registry, the frozen
//! scorer and the temporal settings, and hands out one [`AnalysisSession`] per
//! video. A session owns its temporal detector (history buffer and class slot
//! map included), so nothing leaks between videos.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::AnalyzerConfig;
use crate::detect::BackendRegistry;
use crate::error::{PresenceError, PresenceResult};
use crate::ingest::{SourceFrame, VideoInfo, VideoSource};
use crate::segments::{extract_segments, Segment};
use crate::temporal::{
    SequenceScorer, TemporalConfig, TemporalDetector, TemporalDiagnostics, TemporalResult,
};

/// One processed frame, as reported to the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    /// Index in the native frame sequence.
    pub frame_number: u64,
    /// `frame_number / fps`, in seconds.
    pub timestamp: f64,
    #[serde(flatten)]
    pub result: TemporalResult,
}

impl FrameReport {
    pub fn has_animals(&self) -> bool {
        self.result.has_animals()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub fps: f64,
    pub frame_count: u64,
    pub duration: f64,
    pub processed_frames: u64,
    pub detector: String,
    pub sequence_length: usize,
    pub decision_threshold: f32,
    pub diagnostics: TemporalDiagnostics,
}

/// Full result of one video.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoReport {
    pub frame_results: Vec<FrameReport>,
    pub animal_segments: Vec<Segment>,
    pub metadata: ReportMetadata,
}

impl VideoReport {
    /// Frames reported as containing animals.
    pub fn animal_frames(&self) -> usize {
        self.frame_results.iter().filter(|f| f.has_animals()).count()
    }
}

/// Builds analysis sessions that share a registry and a frozen scorer.
pub struct VideoAnalyzer {
    registry: BackendRegistry,
    backend: String,
    scorer: Arc<dyn SequenceScorer>,
    config: TemporalConfig,
}

impl VideoAnalyzer {
    pub fn new(
        registry: BackendRegistry,
        backend: &str,
        scorer: Arc<dyn SequenceScorer>,
        config: TemporalConfig,
    ) -> PresenceResult<Self> {
        config.validate()?;
        if !registry.contains(backend) {
            return Err(PresenceError::configuration(format!(
                "unknown detector backend '{}' (available: {})",
                backend,
                registry.list().join(", ")
            )));
        }
        if scorer.feature_dim() != config.feature_dim {
            return Err(PresenceError::configuration(format!(
                "scorer expects feature dimension {}, configured {}",
                scorer.feature_dim(),
                config.feature_dim
            )));
        }
        Ok(Self {
            registry,
            backend: backend.to_string(),
            scorer,
            config,
        })
    }

    /// Registry, scorer and temporal settings from a loaded config.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self> {
        let registry = config.build_registry()?;
        let scorer = config.build_scorer()?;
        Ok(Self::new(
            registry,
            &config.backend,
            scorer,
            config.temporal_config(),
        )?)
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn config(&self) -> &TemporalConfig {
        &self.config
    }

    /// Start a session for a video with the given metadata.
    ///
    /// `frame_stride` is the number of native frames per processed frame
    /// (1 unless the source skips frames).
    pub fn session(&self, info: VideoInfo, frame_stride: u64) -> PresenceResult<AnalysisSession> {
        if !(info.fps.is_finite() && info.fps > 0.0) {
            return Err(PresenceError::configuration(format!(
                "video frame rate must be positive, got {}",
                info.fps
            )));
        }
        let base = self
            .registry
            .create(&self.backend)
            .map_err(PresenceError::DetectorUnavailable)?;
        let mut detector = TemporalDetector::new(base, self.scorer.clone(), self.config.clone())?;
        detector.load()?;
        log::info!(
            "session started: {} ({:.2} fps, {} frames, stride {})",
            detector.name(),
            info.fps,
            info.frame_count,
            frame_stride.max(1)
        );
        Ok(AnalysisSession {
            detector,
            info,
            frame_stride: frame_stride.max(1),
            frame_results: Vec::new(),
        })
    }

    /// Analyze a whole source.
    pub fn analyze<S: VideoSource + ?Sized>(&self, source: &mut S) -> Result<VideoReport> {
        self.analyze_until(source, &AtomicBool::new(false))
    }

    /// Analyze a source until it ends or `stop` is raised.
    ///
    /// On stop the report covers the frames processed so far.
    pub fn analyze_until<S: VideoSource + ?Sized>(
        &self,
        source: &mut S,
        stop: &AtomicBool,
    ) -> Result<VideoReport> {
        let mut session = self.session(source.info(), source.frame_stride())?;
        while !stop.load(Ordering::SeqCst) {
            let Some(next) = source.next_frame().context("read next video frame")? else {
                break;
            };
            session.process(next)?;
        }
        if stop.load(Ordering::SeqCst) {
            log::warn!(
                "analysis interrupted after {} frames; reporting partial results",
                session.processed_frames()
            );
        }
        Ok(session.finish())
    }
}

/// Per-video owning handle around one temporal detector.
pub struct AnalysisSession {
    detector: TemporalDetector,
    info: VideoInfo,
    frame_stride: u64,
    frame_results: Vec<FrameReport>,
}

impl AnalysisSession {
    pub fn detector_name(&self) -> &str {
        self.detector.name()
    }

    pub fn processed_frames(&self) -> u64 {
        self.frame_results.len() as u64
    }

    /// Classify the next frame. Frames must arrive in video order.
    pub fn process(&mut self, next: SourceFrame) -> PresenceResult<&FrameReport> {
        let result = self.detector.detect(&next.frame)?;
        self.frame_results.push(FrameReport {
            frame_number: next.frame_number,
            timestamp: next.frame_number as f64 / self.info.fps,
            result,
        });
        let index = self.frame_results.len() - 1;
        Ok(&self.frame_results[index])
    }

    /// Close the session and assemble the report.
    pub fn finish(self) -> VideoReport {
        let series: Vec<bool> = self.frame_results.iter().map(|f| f.has_animals()).collect();
        let effective_fps = self.info.fps / self.frame_stride as f64;
        let animal_segments = extract_segments(&series, effective_fps);
        let config = self.detector.config();

        let metadata = ReportMetadata {
            fps: self.info.fps,
            frame_count: self.info.frame_count,
            duration: self.info.duration,
            processed_frames: self.frame_results.len() as u64,
            detector: self.detector.name().to_string(),
            sequence_length: config.sequence_length,
            decision_threshold: config.decision_threshold,
            diagnostics: self.detector.diagnostics(),
        };
        log::info!(
            "session finished: {} frames processed, {} animal segments",
            metadata.processed_frames,
            animal_segments.len()
        );

        VideoReport {
            frame_results: self.frame_results,
            animal_segments,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{FrameDetector, ScriptedBackend};
    use crate::frame::Frame;
    use crate::ingest::MemorySource;
    use crate::temporal::{LstmScorer, LstmWeights, DEFAULT_FEATURE_DIM};

    fn scripted_registry(flags: &'static [bool]) -> BackendRegistry {
        let mut registry = BackendRegistry::new();
        registry.register("scripted", move || {
            Ok(Box::new(ScriptedBackend::from_flags(flags)) as Box<dyn FrameDetector>)
        });
        registry
    }

    fn scorer(sequence_length: usize) -> Arc<dyn SequenceScorer> {
        let weights = LstmWeights::seeded(DEFAULT_FEATURE_DIM, 8, 1, 7);
        Arc::new(LstmScorer::new(weights, sequence_length).unwrap())
    }

    fn blank_frames(n: usize) -> Vec<Frame> {
        vec![Frame::filled(4, 4, [0, 0, 0]); n]
    }

    #[test]
    fn warmup_frames_pass_through_and_timestamps_follow_fps() -> Result<()> {
        let config = TemporalConfig {
            sequence_length: 3,
            ..TemporalConfig::default()
        };
        let analyzer = VideoAnalyzer::new(
            scripted_registry(&[true, false]),
            "scripted",
            scorer(3),
            config,
        )?;
        let mut source = MemorySource::new(blank_frames(4), 4.0);
        let report = analyzer.analyze(&mut source)?;

        assert_eq!(report.frame_results.len(), 4);
        assert!(report.frame_results[0].has_animals());
        assert!(report.frame_results[0].result.temporal_confidence.is_none());
        assert!(report.frame_results[1].result.temporal_confidence.is_none());
        assert!(report.frame_results[2].result.temporal_confidence.is_some());
        assert_eq!(report.frame_results[3].timestamp, 0.75);
        assert_eq!(report.metadata.detector, "temporal_scripted");
        assert_eq!(report.metadata.processed_frames, 4);
        assert_eq!(report.metadata.duration, 1.0);
        Ok(())
    }

    #[test]
    fn zero_frames_yield_empty_report() -> Result<()> {
        let analyzer = VideoAnalyzer::new(
            scripted_registry(&[]),
            "scripted",
            scorer(5),
            TemporalConfig::default(),
        )?;
        let report = analyzer.analyze(&mut MemorySource::new(Vec::new(), 30.0))?;
        assert!(report.frame_results.is_empty());
        assert!(report.animal_segments.is_empty());
        assert_eq!(report.metadata.frame_count, 0);
        Ok(())
    }

    #[test]
    fn raised_stop_flag_yields_partial_report() -> Result<()> {
        let analyzer = VideoAnalyzer::new(
            scripted_registry(&[]),
            "scripted",
            scorer(5),
            TemporalConfig::default(),
        )?;
        let stop = AtomicBool::new(true);
        let mut source = MemorySource::new(blank_frames(10), 10.0);
        let report = analyzer.analyze_until(&mut source, &stop)?;
        assert!(report.frame_results.is_empty());
        assert_eq!(report.metadata.frame_count, 10);
        Ok(())
    }

    #[test]
    fn unknown_backend_is_a_configuration_error() {
        let result = VideoAnalyzer::new(
            BackendRegistry::with_builtin(),
            "yolo",
            scorer(5),
            TemporalConfig::default(),
        );
        assert!(matches!(result, Err(PresenceError::Configuration(_))));
    }

    #[test]
    fn non_positive_fps_is_rejected() -> Result<()> {
        let analyzer = VideoAnalyzer::new(
            BackendRegistry::with_builtin(),
            "stub",
            scorer(5),
            TemporalConfig::default(),
        )?;
        assert!(matches!(
            analyzer.session(VideoInfo::new(0.0, 10), 1),
            Err(PresenceError::Configuration(_))
        ));
        Ok(())
    }

    #[test]
    fn report_serializes_flat_frame_fields() -> Result<()> {
        let analyzer = VideoAnalyzer::new(
            scripted_registry(&[true]),
            "scripted",
            scorer(5),
            TemporalConfig::default(),
        )?;
        let report = analyzer.analyze(&mut MemorySource::new(blank_frames(1), 10.0))?;
        let json = serde_json::to_value(&report)?;
        let frame = &json["frame_results"][0];
        assert_eq!(frame["frame_number"], 0);
        assert_eq!(frame["has_animals"], true);
        assert!(frame["detections"].is_array());
        assert!(frame.get("temporal_confidence").is_none());
        assert!(json["metadata"]["diagnostics"].is_object());
        Ok(())
    }
}
