use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Side length of the classifier input, in pixels
pub const FACE_INPUT_SIZE: usize = 48;

/// Axis-aligned face bounding box in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Where the caption is drawn: 10px above the top-left corner
    pub fn label_anchor(&self) -> (i32, i32) {
        (self.x, self.y - 10)
    }
}

/// Square grayscale face crop, row-major, one byte per pixel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacePatch {
    side: usize,
    pixels: Vec<u8>,
}

impl FacePatch {
    /// Returns `None` unless `pixels` holds exactly `side * side` bytes
    pub fn new(side: usize, pixels: Vec<u8>) -> Option<Self> {
        if side == 0 || pixels.len() != side * side {
            return None;
        }
        Some(Self { side, pixels })
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Face detection and cropping over frames of type `F`
pub trait FaceAnalyzer<F> {
    /// Detect all faces in a frame
    fn detect(&mut self, frame: &F) -> Result<Vec<FaceBox>>;

    /// Crop a detected face and resize it to a `side` x `side` grayscale patch
    fn patch(&mut self, frame: &F, face: &FaceBox, side: usize) -> Result<FacePatch>;
}
