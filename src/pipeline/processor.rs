use anyhow::{bail, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::capture::FrameSource;
use crate::emotion::{EmotionModel, EmotionScorer, Prediction};
use crate::session::FaceReading;
use crate::vision::{Display, FaceAnalyzer, FaceBox, KeyAction, OverlayStyle, FACE_INPUT_SIZE};

/// Message from the capture thread
#[derive(Debug)]
pub enum ProcessorMessage {
    /// Camera opened; sent before any frame
    CameraOpened { index: i32 },
    /// Faces classified in one frame
    Frame {
        frame_index: u64,
        readings: Vec<FaceReading>,
    },
    /// Processing status update
    Status { frames: u64, faces: u64 },
    /// Capture thread stopped after `frames` processed frames
    Stopped { frames: u64 },
    /// Error occurred
    Error(String),
}

/// Capture loop configuration
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Side length of the face patch fed to the model
    pub face_size: usize,
    pub status_interval_ms: u64,
    /// Stop after this many non-empty frames
    pub max_frames: Option<u64>,
    /// Consecutive empty reads tolerated before the source is given up on
    pub max_empty_frames: u32,
    /// Pause between consecutive empty reads
    pub empty_frame_backoff_ms: u64,
    pub style: OverlayStyle,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            face_size: FACE_INPUT_SIZE,
            status_interval_ms: 5000,
            max_frames: None,
            max_empty_frames: 100,
            empty_frame_backoff_ms: 10,
            style: OverlayStyle::default(),
        }
    }
}

/// The collaborators of the capture loop
pub struct Stages<S, A, M, D> {
    pub source: S,
    pub analyzer: A,
    pub model: M,
    pub display: D,
}

/// Run the capture loop until quit, stop flag, frame limit or source error.
///
/// Emits `ProcessorMessage::Stopped` last in every case.
pub fn run_processor<S, A, M, D>(
    stages: &mut Stages<S, A, M, D>,
    scorer: &EmotionScorer,
    config: &ProcessorConfig,
    tx: &mpsc::Sender<ProcessorMessage>,
    stop_flag: Arc<AtomicBool>,
) where
    S: FrameSource,
    A: FaceAnalyzer<S::Frame>,
    M: EmotionModel,
    D: Display<S::Frame>,
{
    let mut frames = 0u64;
    let result = run_processor_inner(stages, scorer, config, tx, stop_flag, &mut frames);

    if let Err(e) = result {
        let _ = tx.blocking_send(ProcessorMessage::Error(format!("{:#}", e)));
    }

    let _ = tx.blocking_send(ProcessorMessage::Stopped { frames });
}

fn run_processor_inner<S, A, M, D>(
    stages: &mut Stages<S, A, M, D>,
    scorer: &EmotionScorer,
    config: &ProcessorConfig,
    tx: &mpsc::Sender<ProcessorMessage>,
    stop_flag: Arc<AtomicBool>,
    frames: &mut u64,
) -> Result<()>
where
    S: FrameSource,
    A: FaceAnalyzer<S::Frame>,
    M: EmotionModel,
    D: Display<S::Frame>,
{
    info!(
        "Starting capture loop: {}x{} face input, {} labels",
        config.face_size,
        config.face_size,
        scorer.labels().len()
    );

    let mut faces_total = 0u64;
    let mut last_status_time = Instant::now();
    let status_interval = Duration::from_millis(config.status_interval_ms);
    let empty_backoff = Duration::from_millis(config.empty_frame_backoff_ms);
    let mut empty_reads = 0u32;

    loop {
        if stop_flag.load(Ordering::Relaxed) {
            info!("Stop flag received");
            break;
        }

        if config.max_frames.is_some_and(|max| *frames >= max) {
            info!("Frame limit reached: {}", *frames);
            break;
        }

        let Some(mut frame) = stages.source.read()? else {
            empty_reads += 1;
            if empty_reads > config.max_empty_frames {
                bail!("No frame from camera after {} consecutive empty reads", empty_reads);
            }
            trace!("Empty frame {}, skipping", empty_reads);
            if !empty_backoff.is_zero() {
                std::thread::sleep(empty_backoff);
            }
            continue;
        };
        empty_reads = 0;
        let frame_index = *frames;
        *frames += 1;

        let faces = stages.analyzer.detect(&frame)?;
        let mut readings = Vec::with_capacity(faces.len());

        for face in faces {
            stages.display.draw_face(&mut frame, &face)?;
            match classify(stages, scorer, config.face_size, &frame, &face) {
                Ok((prediction, probabilities)) => {
                    let caption = config.style.caption(&prediction.label);
                    stages.display.draw_caption(&mut frame, &face, &caption)?;
                    readings.push(FaceReading {
                        frame_index,
                        face,
                        prediction,
                        probabilities,
                    });
                }
                Err(e) => {
                    warn!("Skipping face {:?} in frame {}: {}", face, frame_index, e);
                }
            }
        }

        faces_total += readings.len() as u64;

        if !readings.is_empty() {
            debug!("Frame {}: {} face(s) classified", frame_index, readings.len());
            if tx
                .blocking_send(ProcessorMessage::Frame {
                    frame_index,
                    readings,
                })
                .is_err()
            {
                warn!("Failed to send readings, receiver dropped");
                return Ok(());
            }
        }

        if stages.display.present(&frame)? == KeyAction::Quit {
            info!("Exit requested by user");
            break;
        }

        // Send status updates periodically
        if last_status_time.elapsed() >= status_interval {
            let _ = tx.blocking_send(ProcessorMessage::Status {
                frames: *frames,
                faces: faces_total,
            });
            last_status_time = Instant::now();
        }
    }

    info!("Capture loop stopped after {} frames", *frames);
    Ok(())
}

fn classify<S, A, M, D>(
    stages: &mut Stages<S, A, M, D>,
    scorer: &EmotionScorer,
    face_size: usize,
    frame: &S::Frame,
    face: &FaceBox,
) -> Result<(Prediction, Vec<f64>)>
where
    S: FrameSource,
    A: FaceAnalyzer<S::Frame>,
    M: EmotionModel,
{
    let patch = stages.analyzer.patch(frame, face, face_size)?;
    let logits = stages.model.infer(&patch)?;
    Ok(scorer.score(&logits)?)
}
