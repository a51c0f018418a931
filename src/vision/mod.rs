//! Face detection, cropping and on-screen overlay.

#[cfg(feature = "camera")]
mod cascade;
mod display;
mod face;
#[cfg(feature = "camera")]
mod window;

#[cfg(feature = "camera")]
pub use cascade::CascadeAnalyzer;
pub use display::{Display, Headless, KeyAction, OverlayStyle};
pub use face::{FaceAnalyzer, FaceBox, FacePatch, FACE_INPUT_SIZE};
#[cfg(feature = "camera")]
pub use window::Window;
