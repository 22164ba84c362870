use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;

use animal_presence::detect::{BackendRegistry, FrameDetector, ScriptedBackend};
use animal_presence::error::PresenceResult;
use animal_presence::ingest::{
    Decimated, FileConfig, FileSource, MemorySource, SourceFrame, VideoInfo,
};
use animal_presence::segments::extract_segments;
use animal_presence::temporal::{FeatureVector, SequenceScorer, TemporalConfig};
use animal_presence::{Frame, VideoAnalyzer, VideoReport};

/// Fraction of window frames whose presence slot is set.
struct PresenceRatioScorer {
    sequence_length: usize,
    feature_dim: usize,
    calls: AtomicUsize,
}

impl PresenceRatioScorer {
    fn new(config: &TemporalConfig) -> Self {
        Self {
            sequence_length: config.sequence_length,
            feature_dim: config.feature_dim,
            calls: AtomicUsize::new(0),
        }
    }
}

impl SequenceScorer for PresenceRatioScorer {
    fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    fn score(&self, sequence: &[FeatureVector]) -> PresenceResult<f32> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let present = sequence.iter().filter(|f| f.get(0) == Some(1.0)).count();
        Ok(present as f32 / sequence.len() as f32)
    }
}

fn stub_analyzer() -> (VideoAnalyzer, Arc<PresenceRatioScorer>) {
    let config = TemporalConfig::default();
    let scorer = Arc::new(PresenceRatioScorer::new(&config));
    let analyzer = VideoAnalyzer::new(
        BackendRegistry::with_builtin(),
        "stub",
        scorer.clone(),
        config,
    )
    .expect("analyzer");
    (analyzer, scorer)
}

fn synthetic(frames: u64) -> FileSource {
    FileSource::open(FileConfig {
        synthetic_frames: frames,
        synthetic_fps: 10.0,
        ..FileConfig::new("stub://trail")
    })
    .expect("synthetic source")
}

fn flags(report: &VideoReport) -> Vec<bool> {
    report.frame_results.iter().map(|f| f.has_animals()).collect()
}

#[test]
fn synthetic_video_smooths_dropouts_into_segments() -> Result<()> {
    let (analyzer, _) = stub_analyzer();
    let report = analyzer.analyze(&mut synthetic(80))?;

    assert_eq!(report.frame_results.len(), 80);
    assert_eq!(report.metadata.detector, "temporal_stub");
    assert_eq!(report.metadata.frame_count, 80);
    assert_eq!(report.metadata.duration, 8.0);

    // frames 28 and 35 are detector misses inside the first visit
    let flags = flags(&report);
    assert!(flags[28]);
    assert!(flags[35]);

    let spans: Vec<(usize, usize)> = report
        .animal_segments
        .iter()
        .map(|s| (s.start_frame, s.end_frame))
        .collect();
    assert_eq!(spans, vec![(22, 42), (62, 79)]);
    assert_eq!(report.animal_segments[0].start_time, 2.2);
    assert_eq!(report.animal_segments[1].end_time, 7.9);
    Ok(())
}

#[test]
fn warmup_frames_carry_no_temporal_confidence() -> Result<()> {
    let (analyzer, _) = stub_analyzer();
    let report = analyzer.analyze(&mut synthetic(10))?;

    for frame in &report.frame_results[..4] {
        assert!(frame.result.temporal_confidence.is_none());
    }
    for frame in &report.frame_results[4..] {
        assert_eq!(frame.result.temporal_confidence, Some(0.0));
        assert!(!frame.has_animals());
    }
    Ok(())
}

#[test]
fn quiet_video_never_invokes_the_scorer() -> Result<()> {
    let (analyzer, scorer) = stub_analyzer();
    let frames = vec![Frame::filled(32, 32, [5, 5, 5]); 30];
    let report = analyzer.analyze(&mut MemorySource::new(frames, 15.0))?;

    assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.metadata.diagnostics.scorer_invocations, 0);
    assert_eq!(report.metadata.diagnostics.fast_path_skips, 26);
    assert!(report.animal_segments.is_empty());
    Ok(())
}

#[test]
fn segments_agree_with_reported_flags() -> Result<()> {
    let (analyzer, _) = stub_analyzer();
    let report = analyzer.analyze(&mut synthetic(120))?;
    assert_eq!(
        report.animal_segments,
        extract_segments(&flags(&report), report.metadata.fps)
    );
    Ok(())
}

#[test]
fn skipped_frames_keep_native_numbers_and_scale_segment_times() -> Result<()> {
    let (analyzer, _) = stub_analyzer();
    let mut source = Decimated::new(synthetic(80), 1);
    let report = analyzer.analyze(&mut source)?;

    assert_eq!(report.frame_results.len(), 40);
    for (i, frame) in report.frame_results.iter().enumerate() {
        assert_eq!(frame.frame_number, 2 * i as u64);
        assert_eq!(frame.timestamp, frame.frame_number as f64 / 10.0);
    }
    assert!(!report.animal_segments.is_empty());
    for segment in &report.animal_segments {
        assert_eq!(segment.start_time, segment.start_frame as f64 / 5.0);
        assert_eq!(segment.end_time, segment.end_frame as f64 / 5.0);
    }
    Ok(())
}

#[test]
fn empty_video_yields_empty_report() -> Result<()> {
    let (analyzer, _) = stub_analyzer();
    let report = analyzer.analyze(&mut MemorySource::new(Vec::new(), 25.0))?;
    assert!(report.frame_results.is_empty());
    assert!(report.animal_segments.is_empty());
    assert_eq!(report.metadata.processed_frames, 0);
    Ok(())
}

#[test]
fn sessions_do_not_share_history() -> Result<()> {
    let config = TemporalConfig {
        sequence_length: 3,
        ..TemporalConfig::default()
    };
    let mut registry = BackendRegistry::new();
    registry.register("scripted", || {
        Ok(Box::new(ScriptedBackend::from_flags(&[true; 4])) as Box<dyn FrameDetector>)
    });
    let scorer = Arc::new(PresenceRatioScorer::new(&config));
    let analyzer = VideoAnalyzer::new(registry, "scripted", scorer, config)?;
    let frame = |frame_number: u64| SourceFrame {
        frame_number,
        frame: Frame::filled(2, 2, [0, 0, 0]),
    };

    let mut first = analyzer.session(VideoInfo::new(10.0, 4), 1)?;
    for n in 0..4 {
        first.process(frame(n))?;
    }
    let first = first.finish();
    assert_eq!(first.frame_results[3].result.temporal_confidence, Some(1.0));

    let mut second = analyzer.session(VideoInfo::new(10.0, 4), 1)?;
    let report = second.process(frame(0))?;
    assert!(report.result.temporal_confidence.is_none());
    assert!(report.has_animals());
    Ok(())
}

#[test]
fn report_json_keeps_wire_field_names() -> Result<()> {
    let (analyzer, _) = stub_analyzer();
    let report = analyzer.analyze(&mut synthetic(30))?;
    let json = serde_json::to_value(&report)?;

    for key in ["frame_results", "animal_segments", "metadata"] {
        assert!(json.get(key).is_some(), "missing {}", key);
    }
    let frame = &json["frame_results"][22];
    assert_eq!(frame["detections"][0]["class"], "dog");
    assert_eq!(
        frame["detections"][0]["bbox"].as_array().map(|b| b.len()),
        Some(4)
    );
    assert!(frame["temporal_confidence"].is_number());

    let parsed: VideoReport = serde_json::from_value(json)?;
    assert_eq!(parsed.frame_results.len(), 30);
    Ok(())
}
