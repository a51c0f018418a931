//! Emotion classification: the ONNX classifier and the scoring of its output.
//!
//! The classifier emits one logit per class in the order of a [`LabelSet`];
//! [`EmotionScorer`] turns those logits into a probability distribution and
//! picks the most probable label.

mod labels;
mod model;
mod scorer;

pub use labels::LabelSet;
pub use model::{EmotionModel, ModelConfig, ModelError, OnnxEmotionModel};
pub use scorer::{EmotionScorer, Prediction};
