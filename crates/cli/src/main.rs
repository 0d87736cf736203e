use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

use clap::Parser;

use facegauge_core::capture::domain::frame_source::FrameSource;
use facegauge_core::capture::infrastructure::nokhwa_camera_source::NokhwaCameraSource;
use facegauge_core::capture::infrastructure::synthetic_source::SyntheticSource;
use facegauge_core::capture::infrastructure::video_file_source::VideoFileSource;
use facegauge_core::detection::domain::backend_config::BackendConfig;
use facegauge_core::detection::infrastructure::backend_factory::{create_backend, BackendKind};
use facegauge_core::pipeline::capture_loop::CaptureLoop;
use facegauge_core::pipeline::display_sink::{ChannelDisplaySink, DisplayUpdate};
use facegauge_core::pipeline::frame_processor::{BackendSlot, FrameProcessor};
use facegauge_core::shared::constants::{
    DEFAULT_DOWNSCALE_FACTOR, DEFAULT_GPU_MAX_DETECTIONS, DEFAULT_MIN_FACE_SIZE,
    DEFAULT_WINDOW_CAPACITY,
};

/// Live face detection with CPU and GPU backends racing on every frame.
#[derive(Parser)]
#[command(name = "facegauge")]
struct Cli {
    /// Cascade model file (JSON).
    #[arg(long)]
    model: PathBuf,

    /// Separate model for the GPU backend (defaults to --model).
    #[arg(long)]
    gpu_model: Option<PathBuf>,

    /// Camera index to capture from.
    #[arg(long, default_value = "0", conflicts_with_all = ["input", "synthetic"])]
    camera: u32,

    /// Read frames from a video file instead of a camera.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Generate synthetic frames (no camera or file needed).
    #[arg(long, conflicts_with = "input")]
    synthetic: bool,

    /// Stop after this many seconds (default: run until the source ends).
    #[arg(long)]
    duration: Option<u64>,

    /// Downscale factor applied before detection.
    #[arg(long, default_value_t = DEFAULT_DOWNSCALE_FACTOR)]
    downscale: u32,

    /// Rolling-average window size in samples.
    #[arg(long, default_value_t = DEFAULT_WINDOW_CAPACITY)]
    window: usize,

    /// Minimum face size in pixels (applied to both dimensions).
    #[arg(long, default_value_t = DEFAULT_MIN_FACE_SIZE.0)]
    min_face_size: u32,

    /// Cap on detections per frame for the GPU backend.
    #[arg(long, default_value_t = DEFAULT_GPU_MAX_DETECTIONS)]
    max_faces: usize,

    /// Skip the CPU backend.
    #[arg(long)]
    no_cpu: bool,

    /// Skip the GPU backend.
    #[arg(long)]
    no_gpu: bool,

    /// Save every Nth annotated frame as a PNG into this directory.
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Snapshot interval in frames.
    #[arg(long, default_value = "30")]
    snapshot_every: usize,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.no_cpu && cli.no_gpu {
        return Err("at least one backend must stay enabled".into());
    }
    if let Some(dir) = &cli.snapshot_dir {
        std::fs::create_dir_all(dir)?;
    }

    let source = build_source(&cli);
    let slots = build_slots(&cli)?;

    let (sink, updates) = ChannelDisplaySink::pair();
    let processor = FrameProcessor::new(slots, Box::new(sink))
        .with_downscale_factor(cli.downscale);

    let mut capture = CaptureLoop::new(source, processor);
    capture.start()?;

    present(&cli, &updates);

    capture.stop();
    Ok(())
}

fn build_source(cli: &Cli) -> Box<dyn FrameSource> {
    if cli.synthetic {
        Box::new(SyntheticSource::new(1280, 720).with_interval(Duration::from_millis(33)))
    } else if let Some(path) = &cli.input {
        Box::new(VideoFileSource::new(path))
    } else {
        Box::new(NokhwaCameraSource::new(cli.camera))
    }
}

fn build_slots(cli: &Cli) -> Result<Vec<BackendSlot>, Box<dyn std::error::Error>> {
    let min_size = (cli.min_face_size, cli.min_face_size);
    let mut slots = Vec::new();

    if !cli.no_cpu {
        let config = BackendConfig::new(&cli.model).with_min_size(min_size);
        let detector = create_backend(BackendKind::Cpu, config)?;
        slots.push(BackendSlot::new(BackendKind::Cpu, detector).with_window_capacity(cli.window));
    }

    if !cli.no_gpu {
        let model = cli.gpu_model.as_ref().unwrap_or(&cli.model);
        let config = BackendConfig::new(model)
            .with_min_size(min_size)
            .with_max_detections(cli.max_faces);
        match create_backend(BackendKind::Gpu, config) {
            Ok(detector) => slots.push(
                BackendSlot::new(BackendKind::Gpu, detector).with_window_capacity(cli.window),
            ),
            // No GPU is not fatal as long as the CPU backend runs.
            Err(e) if !cli.no_cpu => log::warn!("GPU backend unavailable: {e}"),
            Err(e) => return Err(e.into()),
        }
    }

    if slots.is_empty() {
        return Err("no detection backend could be constructed".into());
    }

    Ok(slots)
}

/// Drains display updates, logging latency readings and optionally saving
/// snapshots, until the run duration elapses or the source goes quiet.
fn present(cli: &Cli, updates: &crossbeam_channel::Receiver<DisplayUpdate>) {
    let started = Instant::now();
    let mut last_update = Instant::now();
    let mut last_report = Instant::now();
    let mut presented = 0usize;

    loop {
        if let Some(secs) = cli.duration {
            if started.elapsed() >= Duration::from_secs(secs) {
                break;
            }
        }

        let update = match updates.recv_timeout(Duration::from_millis(250)) {
            Ok(update) => update,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                // A live camera keeps producing; prolonged silence means
                // the source is exhausted.
                if last_update.elapsed() > Duration::from_secs(3) {
                    log::info!("source went quiet, shutting down");
                    break;
                }
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        };

        last_update = Instant::now();
        presented += 1;

        if last_report.elapsed() >= Duration::from_secs(1) {
            for reading in &update.readings {
                let state = if reading.enabled { "on" } else { "off" };
                log::info!(
                    "{} [{}]: {:.1} ms avg over {} samples",
                    reading.kind,
                    state,
                    reading.average_ms,
                    reading.sample_count,
                );
            }
            last_report = Instant::now();
        }

        if let Some(dir) = &cli.snapshot_dir {
            if cli.snapshot_every > 0 && presented % cli.snapshot_every == 0 {
                if let Err(e) = save_snapshot(dir, &update) {
                    log::warn!("snapshot failed: {e}");
                }
            }
        }
    }

    log::info!("presented {presented} frames in {:.1}s", started.elapsed().as_secs_f64());
}

fn save_snapshot(
    dir: &std::path::Path,
    update: &DisplayUpdate,
) -> Result<(), Box<dyn std::error::Error>> {
    let frame = &update.frame;
    let path = dir.join(format!("frame_{:06}.png", frame.index()));
    let buffer = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or("frame buffer size mismatch")?;
    buffer.save(&path)?;
    log::debug!("saved {}", path.display());
    Ok(())
}
