#[cfg(feature = "camera")]
pub mod camera;
pub mod source;

#[cfg(feature = "camera")]
pub use camera::Camera;
pub use source::{open_with_fallback, FrameSource};
