pub mod record;

pub use record::{FaceReading, SessionRecord};
