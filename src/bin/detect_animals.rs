//! detect_animals - temporal animal presence detection over one video.
//!
//! Reads a local video (or a synthetic `stub://` scene), classifies every
//! processed frame with the configured detector plus temporal smoothing, and
//! writes a JSON report with per-frame results and animal segments.
//!
//! Ctrl-C stops reading frames; the report still covers what was processed.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use animal_presence::config::AnalyzerConfig;
use animal_presence::ingest::{Decimated, FileConfig, FileSource, VideoSource};
use animal_presence::pipeline::{VideoAnalyzer, VideoReport};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(
    name = "detect_animals",
    about = "Detect animal presence in a video with temporal smoothing"
)]
struct Args {
    /// Local video file, or stub://<name> for a synthetic scene
    #[arg(long, value_name = "PATH")]
    input: String,

    /// Config file (JSON, or TOML with a .toml extension); overrides ANIMAL_CONFIG
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Frame detector backend (stub, tract)
    #[arg(long)]
    backend: Option<String>,

    /// Process every (N + 1)-th frame
    #[arg(long, value_name = "N")]
    skip_frames: Option<u64>,

    /// Temporal decision threshold in [0, 1]
    #[arg(long)]
    threshold: Option<f32>,

    /// Frames in the temporal window
    #[arg(long)]
    sequence_length: Option<usize>,

    /// Synthetic scenes only: number of frames
    #[arg(long, default_value_t = 200)]
    synthetic_frames: u64,

    /// Synthetic scenes only: frame rate
    #[arg(long, default_value_t = 10.0)]
    synthetic_fps: f64,

    /// Write the JSON report here instead of stdout
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty, args.output.is_none() && !stdout_is_tty);

    let cfg = {
        let _stage = ui.stage("Load configuration");
        load_config(&args)?
    };

    let analyzer = {
        let _stage = ui.stage("Prepare detector");
        VideoAnalyzer::from_config(&cfg)?
    };

    let mut source = {
        let _stage = ui.stage("Open video");
        let file = FileSource::open(FileConfig {
            synthetic_frames: args.synthetic_frames,
            synthetic_fps: args.synthetic_fps,
            ..FileConfig::new(&args.input)
        })?;
        Decimated::new(file, cfg.ingest.skip_frames)
    };

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::SeqCst);
        })
        .context("install Ctrl-C handler")?;
    }

    let report = {
        let _stage = ui.stage("Analyze frames");
        analyze(&analyzer, &mut source, &stop, &ui)?
    };

    {
        let _stage = ui.stage("Write report");
        write_report(&report, args.output.as_ref())?;
    }

    log::info!(
        "{}: {} of {} processed frames with animals, {} segments",
        report.metadata.detector,
        report.animal_frames(),
        report.metadata.processed_frames,
        report.animal_segments.len()
    );
    Ok(())
}

fn load_config(args: &Args) -> Result<AnalyzerConfig> {
    let mut cfg = match &args.config {
        Some(path) => AnalyzerConfig::load_from(Some(path.as_path()))?,
        None => AnalyzerConfig::load()?,
    };
    if let Some(backend) = &args.backend {
        cfg.backend = backend.clone();
    }
    if let Some(skip) = args.skip_frames {
        cfg.ingest.skip_frames = skip;
    }
    if let Some(threshold) = args.threshold {
        cfg.temporal.decision_threshold = threshold;
    }
    if let Some(length) = args.sequence_length {
        cfg.temporal.sequence_length = length;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn analyze<S: VideoSource>(
    analyzer: &VideoAnalyzer,
    source: &mut S,
    stop: &AtomicBool,
    ui: &ui::Ui,
) -> Result<VideoReport> {
    let info = source.info();
    let mut session = analyzer.session(info, source.frame_stride())?;
    let mut progress = ui.frames(info.frame_count);

    while !stop.load(Ordering::SeqCst) {
        let Some(next) = source.next_frame().context("read next video frame")? else {
            break;
        };
        let frame_number = next.frame_number;
        let report = session.process(next)?;
        progress.advance(frame_number, report.has_animals());
    }
    drop(progress);

    if stop.load(Ordering::SeqCst) {
        log::warn!(
            "interrupted after {} frames; writing partial report",
            session.processed_frames()
        );
    }
    Ok(session.finish())
}

fn write_report(report: &VideoReport, output: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("serialize report")?;
    match output {
        Some(path) => std::fs::write(path, json.as_bytes())
            .with_context(|| format!("write report to {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}
