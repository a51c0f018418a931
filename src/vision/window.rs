use anyhow::{Context, Result};
use opencv::{
    core::{Mat, Point, Rect, Scalar},
    highgui, imgproc,
};
use tracing::debug;

use super::display::{Display, KeyAction, OverlayStyle};
use super::face::FaceBox;

const KEY_ESCAPE: i32 = 27;

fn bgr(color: [u8; 3]) -> Scalar {
    Scalar::new(
        f64::from(color[0]),
        f64::from(color[1]),
        f64::from(color[2]),
        0.0,
    )
}

/// HighGUI window showing annotated camera frames
pub struct Window {
    title: String,
    style: OverlayStyle,
}

impl Window {
    pub fn new(title: &str, style: OverlayStyle) -> Result<Self> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)
            .with_context(|| format!("Failed to open window {:?}", title))?;
        debug!("Opened window {:?}", title);
        Ok(Self {
            title: title.to_string(),
            style,
        })
    }
}

impl Display<Mat> for Window {
    fn draw_face(&mut self, frame: &mut Mat, face: &FaceBox) -> Result<()> {
        imgproc::rectangle(
            frame,
            Rect::new(face.x, face.y, face.width, face.height),
            bgr(self.style.box_color),
            self.style.thickness,
            imgproc::LINE_8,
            0,
        )?;
        Ok(())
    }

    fn draw_caption(&mut self, frame: &mut Mat, face: &FaceBox, caption: &str) -> Result<()> {
        let (x, y) = face.label_anchor();
        imgproc::put_text(
            frame,
            caption,
            Point::new(x, y),
            imgproc::FONT_HERSHEY_SIMPLEX,
            self.style.font_scale,
            bgr(self.style.text_color),
            self.style.thickness,
            imgproc::LINE_8,
            false,
        )?;
        Ok(())
    }

    fn present(&mut self, frame: &Mat) -> Result<KeyAction> {
        highgui::imshow(&self.title, frame)?;
        let key = highgui::wait_key(1)?;
        if key == KEY_ESCAPE || key == i32::from(b'q') {
            return Ok(KeyAction::Quit);
        }
        Ok(KeyAction::Continue)
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        let _ = highgui::destroy_window(&self.title);
    }
}
