use anyhow::{Context, Result};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture},
};
use tracing::debug;

use super::source::FrameSource;

/// Webcam opened through OpenCV's video I/O
pub struct Camera {
    capture: VideoCapture,
    index: i32,
}

impl Camera {
    pub fn new(index: i32) -> Result<Self> {
        debug!("Opening camera {}", index);
        let capture = VideoCapture::new(index, videoio::CAP_ANY)
            .with_context(|| format!("Failed to create capture for camera {}", index))?;
        Ok(Self { capture, index })
    }

    pub fn index(&self) -> i32 {
        self.index
    }

    /// Frame size reported by the driver, if any
    pub fn frame_size(&self) -> Result<(i32, i32)> {
        let width = self.capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = self.capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32;
        Ok((width, height))
    }
}

impl FrameSource for Camera {
    type Frame = Mat;

    fn is_opened(&self) -> Result<bool> {
        Ok(self.capture.is_opened()?)
    }

    fn read(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        let grabbed = self
            .capture
            .read(&mut frame)
            .with_context(|| format!("Failed to read from camera {}", self.index))?;
        if !grabbed || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        let _ = self.capture.release();
    }
}
