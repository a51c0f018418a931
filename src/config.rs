use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::emotion::LabelSet;
use crate::vision::{OverlayStyle, FACE_INPUT_SIZE};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schema_version: u32,

    // Camera
    /// Camera indices tried in order until one opens
    pub camera_indices: Vec<i32>,
    /// Delay after opening a camera before checking it
    pub camera_warmup_ms: u64,
    /// Consecutive empty frames tolerated before capture gives up
    pub max_empty_frames: u32,
    pub empty_frame_backoff_ms: u64,

    // Models
    pub cascade_path: Option<PathBuf>,
    pub model_path: Option<PathBuf>,
    pub model_threads: usize,
    pub face_size: usize,
    /// Model output classes, in output order
    pub labels: LabelSet,

    // Display
    pub window_title: String,
    pub headless: bool,
    pub overlay: OverlayStyle,
    pub print_probabilities: bool,
    pub status_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: 1,
            camera_indices: vec![0, 1],
            camera_warmup_ms: 1000,
            max_empty_frames: 100,
            empty_frame_backoff_ms: 10,
            cascade_path: None,
            model_path: None,
            model_threads: 1,
            face_size: FACE_INPUT_SIZE,
            labels: LabelSet::default(),
            window_title: "Mood Detector (press 'q' to quit)".to_string(),
            headless: false,
            overlay: OverlayStyle::default(),
            print_probabilities: true,
            status_interval_ms: 5000,
        }
    }
}

impl Config {
    /// Load config from file, or create default
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .context("Failed to read config file")?;
            serde_json::from_str(&content)
                .context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        std::fs::write(path, content)
            .context("Failed to write config file")
    }

    /// Get the default config directory
    pub fn default_config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Failed to get home directory")?;
        Ok(home.join(".moodcam"))
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.json"))
    }

    /// Get the default models directory
    pub fn default_models_dir() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("models"))
    }

    /// Get the emotion model file path
    pub fn get_model_path(&self) -> Result<PathBuf> {
        match self.model_path {
            Some(ref path) => Ok(path.clone()),
            None => Ok(Self::default_models_dir()?.join(DEFAULT_MODEL_FILE)),
        }
    }

    /// Get the face cascade file path
    pub fn get_cascade_path(&self) -> Result<PathBuf> {
        match self.cascade_path {
            Some(ref path) => Ok(path.clone()),
            None => Ok(Self::default_models_dir()?.join(DEFAULT_CASCADE_FILE)),
        }
    }

    pub fn camera_warmup(&self) -> Duration {
        Duration::from_millis(self.camera_warmup_ms)
    }
}

pub const DEFAULT_MODEL_FILE: &str = "emotion.onnx";
pub const DEFAULT_CASCADE_FILE: &str = "haarcascade_frontalface_default.xml";
