//! Emotion classifier backed by an ONNX model.
//!
//! The model takes a single grayscale face, `[1, 1, side, side]` with pixel
//! values scaled to [0, 1], and returns one logit per emotion class.

#[cfg(feature = "onnx")]
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Value,
};
use std::path::PathBuf;
use thiserror::Error;

use crate::vision::{FacePatch, FACE_INPUT_SIZE};

/// Errors that can occur during emotion inference
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to load model: {0}")]
    ModelLoadError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Feature not enabled")]
    FeatureNotEnabled,
}

/// Anything that turns a face patch into per-class logits
pub trait EmotionModel {
    fn infer(&mut self, patch: &FacePatch) -> Result<Vec<f32>, ModelError>;
}

/// Input tensor for the classifier: shape plus row-major data
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    pub shape: [usize; 4],
    pub data: Vec<f32>,
}

/// Convert a face patch into a `[1, 1, side, side]` tensor scaled by 1/255
pub fn to_input_tensor(patch: &FacePatch) -> InputTensor {
    let side = patch.side();
    let data = patch
        .pixels()
        .iter()
        .map(|&p| f32::from(p) / 255.0)
        .collect();

    InputTensor {
        shape: [1, 1, side, side],
        data,
    }
}

/// Reject a patch whose side differs from the model input
pub fn check_patch(patch: &FacePatch, input_side: usize) -> Result<(), ModelError> {
    if patch.side() != input_side {
        return Err(ModelError::InvalidInput(format!(
            "face patch is {0}x{0}, model expects {1}x{1}",
            patch.side(),
            input_side
        )));
    }
    Ok(())
}

/// Configuration for the ONNX classifier
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Path to the emotion ONNX model
    pub model_path: PathBuf,
    /// Number of threads for ONNX inference
    pub n_threads: usize,
    /// Side length of the square grayscale input
    pub input_side: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::new(),
            n_threads: 1,
            input_side: FACE_INPUT_SIZE,
        }
    }
}

/// Emotion classifier running on ONNX Runtime
#[cfg(feature = "onnx")]
pub struct OnnxEmotionModel {
    session: Session,
    input_side: usize,
}

#[cfg(feature = "onnx")]
impl OnnxEmotionModel {
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        if !config.model_path.exists() {
            return Err(ModelError::ModelLoadError(format!(
                "Model not found at {:?}",
                config.model_path
            )));
        }

        let session = Session::builder()
            .map_err(|e| ModelError::ModelLoadError(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ModelError::ModelLoadError(e.to_string()))?
            .with_intra_threads(config.n_threads)
            .map_err(|e| ModelError::ModelLoadError(e.to_string()))?
            .commit_from_file(&config.model_path)
            .map_err(|e| ModelError::ModelLoadError(e.to_string()))?;

        tracing::info!("Emotion model loaded from {:?}", config.model_path);

        Ok(Self {
            session,
            input_side: config.input_side,
        })
    }
}

#[cfg(feature = "onnx")]
impl EmotionModel for OnnxEmotionModel {
    fn infer(&mut self, patch: &FacePatch) -> Result<Vec<f32>, ModelError> {
        check_patch(patch, self.input_side)?;
        let tensor = to_input_tensor(patch);

        let input = Value::from_array((tensor.shape, tensor.data))
            .map_err(|e| ModelError::InferenceError(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| ModelError::InferenceError(e.to_string()))?;

        // Output is [1, num_classes]
        let output = outputs
            .iter()
            .next()
            .ok_or_else(|| ModelError::InferenceError("No output from model".to_string()))?;

        let logits = output
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::InferenceError(e.to_string()))?;

        Ok(logits.1.to_vec())
    }
}

// Stub implementation when feature is not enabled
#[cfg(not(feature = "onnx"))]
pub struct OnnxEmotionModel;

#[cfg(not(feature = "onnx"))]
impl OnnxEmotionModel {
    pub fn new(_config: &ModelConfig) -> Result<Self, ModelError> {
        Err(ModelError::FeatureNotEnabled)
    }
}

#[cfg(not(feature = "onnx"))]
impl EmotionModel for OnnxEmotionModel {
    fn infer(&mut self, _patch: &FacePatch) -> Result<Vec<f32>, ModelError> {
        Err(ModelError::FeatureNotEnabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_tensor_shape_and_scale() {
        let patch = FacePatch::new(2, vec![0, 255, 51, 102]).unwrap();
        let tensor = to_input_tensor(&patch);
        assert_eq!(tensor.shape, [1, 1, 2, 2]);
        assert_eq!(tensor.data[0], 0.0);
        assert_eq!(tensor.data[1], 1.0);
        assert!((tensor.data[2] - 0.2).abs() < 1e-6);
        assert!((tensor.data[3] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_default_config() {
        let config = ModelConfig::default();
        assert_eq!(config.n_threads, 1);
        assert_eq!(config.input_side, 48);
        assert!(config.model_path.as_os_str().is_empty());
    }

    #[test]
    fn test_patch_side_must_match_model_input() {
        let small = FacePatch::new(2, vec![0; 4]).unwrap();
        let result = check_patch(&small, 48);
        assert!(matches!(result, Err(ModelError::InvalidInput(ref m)) if m.contains("2x2")));

        let full = FacePatch::new(48, vec![0; 48 * 48]).unwrap();
        assert!(check_patch(&full, 48).is_ok());
    }

    #[cfg(feature = "onnx")]
    #[test]
    fn test_missing_model_file() {
        let config = ModelConfig {
            model_path: PathBuf::from("/nonexistent/emotion.onnx"),
            ..Default::default()
        };
        let result = OnnxEmotionModel::new(&config);
        assert!(matches!(result, Err(ModelError::ModelLoadError(_))));
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_stub_model() {
        let result = OnnxEmotionModel::new(&ModelConfig::default());
        assert!(matches!(result, Err(ModelError::FeatureNotEnabled)));
    }
}
