mod capture;
mod config;
mod emotion;
mod pipeline;
mod session;
mod vision;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use config::Config;
use emotion::EmotionScorer;
use pipeline::{ProcessorConfig, ProcessorMessage};
use session::SessionRecord;

/// Live webcam emotion detection: detects faces and labels each one's mood
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file (default: ~/.moodcam/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Camera index to try; repeat to set the fallback order
    #[arg(short, long = "camera")]
    cameras: Vec<i32>,

    /// Path to the Haar cascade face detector (.xml)
    #[arg(long)]
    cascade: Option<PathBuf>,

    /// Path to the emotion classifier (.onnx)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Number of threads for ONNX inference
    #[arg(long)]
    threads: Option<usize>,

    /// Run without a preview window
    #[arg(long)]
    headless: bool,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Do not print the probability distribution of each face
    #[arg(long)]
    quiet_probs: bool,

    /// Write the session record as JSON to this file
    #[arg(long)]
    output_json: Option<PathBuf>,

    /// Write the effective config (file plus flags) to the config path and exit
    #[arg(long)]
    save_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Apply command line overrides on top of the loaded config
    fn apply(&self, config: &mut Config) {
        if !self.cameras.is_empty() {
            config.camera_indices = self.cameras.clone();
        }
        if let Some(ref path) = self.cascade {
            config.cascade_path = Some(path.clone());
        }
        if let Some(ref path) = self.model {
            config.model_path = Some(path.clone());
        }
        if let Some(threads) = self.threads {
            config.model_threads = threads;
        }
        if self.headless {
            config.headless = true;
        }
        if self.quiet_probs {
            config.print_probabilities = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let mut config = Config::load(&config_path)?;
    args.apply(&mut config);

    if args.save_config {
        if let Some(dir) = config_path.parent() {
            std::fs::create_dir_all(dir).context("Failed to create config directory")?;
        }
        config.save(&config_path)?;
        println!("Config written to {:?}", config_path);
        return Ok(());
    }

    let model_path = config.get_model_path()?;
    let cascade_path = config.get_cascade_path()?;

    info!("Mood detector starting...");
    info!("Config: {:?}", config_path);
    info!("Model: {:?}", model_path);
    info!("Cascade: {:?}", cascade_path);
    info!("Cameras: {:?}", config.camera_indices);

    if !model_path.exists() {
        error!("Model file not found: {:?}", model_path);
        eprintln!("\nEmotion model not found: {:?}", model_path);
        eprintln!(
            "\nThe model must take a 1x1x{0}x{0} grayscale face and output {1} logits",
            config.face_size,
            config.labels.len()
        );
        eprintln!("in the order: {}", config.labels.iter().collect::<Vec<_>>().join(", "));
        eprintln!("\nPlace the model file at: {:?}", model_path);
        eprintln!("Or specify a custom path with: --model /path/to/model.onnx");
        return Ok(());
    }

    if !cascade_path.exists() {
        error!("Cascade file not found: {:?}", cascade_path);
        eprintln!("\nFace cascade not found: {:?}", cascade_path);
        eprintln!("\nOpenCV ships haarcascade_frontalface_default.xml in its data directory.");
        eprintln!("Place it at: {:?}", cascade_path);
        eprintln!("Or specify a custom path with: --cascade /path/to/cascade.xml");
        return Ok(());
    }

    config.model_path = Some(model_path);
    config.cascade_path = Some(cascade_path);

    let scorer = EmotionScorer::new(config.labels.clone());
    let processor_config = ProcessorConfig {
        face_size: config.face_size,
        status_interval_ms: config.status_interval_ms,
        max_frames: args.max_frames,
        max_empty_frames: config.max_empty_frames,
        empty_frame_backoff_ms: config.empty_frame_backoff_ms,
        style: config.overlay.clone(),
    };

    // Create channels
    let (tx, mut rx) = mpsc::channel::<ProcessorMessage>(32);
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();

    // Spawn capture thread; camera, detector and model live on it
    let thread_config = config.clone();
    let capture_handle = std::thread::spawn(move || {
        run_capture(thread_config, scorer, processor_config, tx, stop_flag_clone);
    });

    // Set up Ctrl+C handler
    let stop_flag_ctrlc = stop_flag.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, stopping...");
        stop_flag_ctrlc.store(true, Ordering::SeqCst);
    });

    let mut session: Option<SessionRecord> = None;
    let mut failed = false;

    while let Some(msg) = rx.recv().await {
        match msg {
            ProcessorMessage::CameraOpened { index } => {
                info!("Capturing from camera {}", index);
                if !config.headless {
                    println!("\nDetecting moods... Press 'q' in the window or Ctrl+C to stop.\n");
                } else {
                    println!("\nDetecting moods... Press Ctrl+C to stop.\n");
                }
                session = Some(SessionRecord::new(index, config.labels.clone()));
            }

            ProcessorMessage::Frame {
                frame_index,
                readings,
            } => {
                for reading in readings {
                    debug!(
                        "Frame {}: {} ({:.0}%)",
                        frame_index,
                        reading.prediction.label,
                        reading.prediction.confidence * 100.0
                    );
                    if config.print_probabilities {
                        println!("Probs: {}", reading.probabilities_text());
                    }
                    if let Some(ref mut session) = session {
                        session.add_reading(reading);
                    }
                }
            }

            ProcessorMessage::Status { frames, faces } => {
                debug!("Status: {} frames, {} faces classified", frames, faces);
            }

            ProcessorMessage::Error(e) => {
                error!("Capture error: {}", e);
                failed = true;
            }

            ProcessorMessage::Stopped { frames } => {
                info!("Capture stopped");
                if let Some(ref mut session) = session {
                    session.record_frames(frames);
                }
                break;
            }
        }
    }

    // Wait for capture thread
    if capture_handle.join().is_err() {
        warn!("Capture thread panicked");
    }

    let Some(mut session) = session else {
        if failed {
            eprintln!("\nNo camera session was started. See the log for details.");
        }
        return Ok(());
    };
    session.finalize();

    // Print summary
    println!("\n--- Session Summary ---");
    println!("Duration: {:.1}s", session.duration_ms() as f64 / 1000.0);
    println!("Frames: {}", session.frames_seen);
    println!("Faces classified: {}", session.readings.len());
    if let Some((label, count)) = session.dominant() {
        println!("Dominant mood: {} ({} readings)", label, count);
        println!("\n{}", session.summary());
    }

    if let Some(ref path) = args.output_json {
        write_session(&session, path)?;
        info!("Session written to {:?}", path);
    }

    info!("Session complete");
    Ok(())
}

fn write_session(session: &SessionRecord, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(session)
        .context("Failed to serialize session")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write session to {:?}", path))
}

/// Body of the capture thread: always ends with `ProcessorMessage::Stopped`
fn run_capture(
    config: Config,
    scorer: EmotionScorer,
    processor_config: ProcessorConfig,
    tx: mpsc::Sender<ProcessorMessage>,
    stop_flag: Arc<AtomicBool>,
) {
    if let Err(e) = start_capture(&config, &scorer, &processor_config, &tx, stop_flag) {
        let _ = tx.blocking_send(ProcessorMessage::Error(format!("{:#}", e)));
        let _ = tx.blocking_send(ProcessorMessage::Stopped { frames: 0 });
    }
}

#[cfg(feature = "camera")]
fn start_capture(
    config: &Config,
    scorer: &EmotionScorer,
    processor_config: &ProcessorConfig,
    tx: &mpsc::Sender<ProcessorMessage>,
    stop_flag: Arc<AtomicBool>,
) -> Result<()> {
    use capture::{open_with_fallback, Camera};
    use emotion::{ModelConfig, OnnxEmotionModel};
    use pipeline::{run_processor, Stages};
    use vision::{CascadeAnalyzer, Headless, Window};

    let analyzer = CascadeAnalyzer::new(&config.get_cascade_path()?)?;

    let model = OnnxEmotionModel::new(&ModelConfig {
        model_path: config.get_model_path()?,
        n_threads: config.model_threads,
        input_side: config.face_size,
    })?;

    let (index, camera) =
        open_with_fallback(&config.camera_indices, config.camera_warmup(), Camera::new)?;
    if let Ok((width, height)) = camera.frame_size() {
        info!("Camera {} frame size: {}x{}", camera.index(), width, height);
    }
    let _ = tx.blocking_send(ProcessorMessage::CameraOpened { index });

    if config.headless {
        let mut stages = Stages {
            source: camera,
            analyzer,
            model,
            display: Headless,
        };
        run_processor(&mut stages, scorer, processor_config, tx, stop_flag);
    } else {
        let display = Window::new(&config.window_title, config.overlay.clone())?;
        let mut stages = Stages {
            source: camera,
            analyzer,
            model,
            display,
        };
        run_processor(&mut stages, scorer, processor_config, tx, stop_flag);
    }

    Ok(())
}

#[cfg(not(feature = "camera"))]
fn start_capture(
    _config: &Config,
    _scorer: &EmotionScorer,
    _processor_config: &ProcessorConfig,
    _tx: &mpsc::Sender<ProcessorMessage>,
    _stop_flag: Arc<AtomicBool>,
) -> Result<()> {
    anyhow::bail!("Camera capture requires the 'camera' feature")
}
