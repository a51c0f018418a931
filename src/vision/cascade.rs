use anyhow::{Context, Result};
use opencv::{
    core::{Mat, Rect, Size, Vector},
    imgproc,
    objdetect::CascadeClassifier,
    prelude::*,
};
use std::path::Path;
use tracing::{debug, info};

use super::face::{FaceAnalyzer, FaceBox, FacePatch};

/// Haar cascade face detector over BGR camera frames
pub struct CascadeAnalyzer {
    classifier: CascadeClassifier,
    gray: Mat,
    /// Data pointer of the frame `gray` was converted from
    gray_source: usize,
}

impl CascadeAnalyzer {
    pub fn new(cascade_path: &Path) -> Result<Self> {
        if !cascade_path.exists() {
            anyhow::bail!("Cascade file not found: {:?}", cascade_path);
        }

        let path = cascade_path.to_str().context("Invalid cascade path")?;
        let classifier = CascadeClassifier::new(path)
            .with_context(|| format!("Failed to load face cascade {:?}", cascade_path))?;
        if classifier.empty()? {
            anyhow::bail!("Face cascade {:?} is empty or unreadable", cascade_path);
        }

        info!("Face cascade loaded from {:?}", cascade_path);

        Ok(Self {
            classifier,
            gray: Mat::default(),
            gray_source: 0,
        })
    }

    fn gray_for(&mut self, frame: &Mat) -> Result<&Mat> {
        let source = frame.data() as usize;
        if source != self.gray_source || self.gray.empty() {
            imgproc::cvt_color_def(frame, &mut self.gray, imgproc::COLOR_BGR2GRAY)
                .context("Failed to convert frame to grayscale")?;
            self.gray_source = source;
        }
        Ok(&self.gray)
    }
}

impl FaceAnalyzer<Mat> for CascadeAnalyzer {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<FaceBox>> {
        imgproc::cvt_color_def(frame, &mut self.gray, imgproc::COLOR_BGR2GRAY)
            .context("Failed to convert frame to grayscale")?;
        self.gray_source = frame.data() as usize;

        let mut rects = Vector::<Rect>::new();
        self.classifier
            .detect_multi_scale_def(&self.gray, &mut rects)
            .context("Face detection failed")?;

        let faces: Vec<FaceBox> = rects
            .iter()
            .map(|r| FaceBox::new(r.x, r.y, r.width, r.height))
            .collect();
        debug!("Detected {} face(s)", faces.len());
        Ok(faces)
    }

    fn patch(&mut self, frame: &Mat, face: &FaceBox, side: usize) -> Result<FacePatch> {
        let gray = self.gray_for(frame)?;

        // Clamp to the frame so the ROI is always valid
        let x = face.x.clamp(0, gray.cols());
        let y = face.y.clamp(0, gray.rows());
        let width = face.width.min(gray.cols() - x);
        let height = face.height.min(gray.rows() - y);
        if width <= 0 || height <= 0 {
            anyhow::bail!("Face box {:?} lies outside the frame", face);
        }

        let roi = Mat::roi(gray, Rect::new(x, y, width, height))?.try_clone()?;
        let mut resized = Mat::default();
        let dim = i32::try_from(side).context("Patch size out of range")?;
        imgproc::resize_def(&roi, &mut resized, Size::new(dim, dim))
            .context("Failed to resize face patch")?;

        let pixels = resized.data_bytes()?.to_vec();
        FacePatch::new(side, pixels).context("Resized face patch has unexpected size")
    }
}
