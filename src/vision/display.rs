use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::face::FaceBox;

/// What the viewer asked for after a frame was shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    Quit,
}

/// How detections are drawn on the frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    /// Face rectangle color (BGR)
    pub box_color: [u8; 3],
    /// Caption color (BGR)
    pub text_color: [u8; 3],
    pub thickness: i32,
    pub font_scale: f64,
    pub caption_prefix: String,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            box_color: [0, 255, 0],
            text_color: [0, 255, 255],
            thickness: 2,
            font_scale: 0.7,
            caption_prefix: "Mood: ".to_string(),
        }
    }
}

impl OverlayStyle {
    pub fn caption(&self, label: &str) -> String {
        format!("{}{}", self.caption_prefix, label)
    }
}

/// Renders annotated frames and reports viewer key presses
pub trait Display<F> {
    /// Draw the box of a detected face onto the frame
    fn draw_face(&mut self, frame: &mut F, face: &FaceBox) -> Result<()>;

    /// Draw a caption above a face box
    fn draw_caption(&mut self, frame: &mut F, face: &FaceBox, caption: &str) -> Result<()>;

    /// Show the frame and poll the keyboard
    fn present(&mut self, frame: &F) -> Result<KeyAction>;
}

/// Display for runs without a window: draws nothing, never quits
#[derive(Debug, Default)]
pub struct Headless;

impl<F> Display<F> for Headless {
    fn draw_face(&mut self, _frame: &mut F, _face: &FaceBox) -> Result<()> {
        Ok(())
    }

    fn draw_caption(&mut self, _frame: &mut F, _face: &FaceBox, _caption: &str) -> Result<()> {
        Ok(())
    }

    fn present(&mut self, _frame: &F) -> Result<KeyAction> {
        Ok(KeyAction::Continue)
    }
}
