use anyhow::Result;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur while opening a camera
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("No camera indices configured")]
    NoCameras,

    #[error("Camera not available (tried indices {tried:?})")]
    Unavailable { tried: Vec<i32> },
}

/// A stream of video frames
pub trait FrameSource {
    type Frame;

    /// Whether the underlying device is open and delivering frames
    fn is_opened(&self) -> Result<bool>;

    /// Read the next frame; `None` for an empty frame the caller should skip
    fn read(&mut self) -> Result<Option<Self::Frame>>;
}

/// Open the first camera that comes up, trying each index once in order.
///
/// `open` creates a handle for an index; after `warmup` the handle is asked
/// whether it opened. Indices whose open fails or that never report opened
/// are skipped.
pub fn open_with_fallback<S, O>(
    indices: &[i32],
    warmup: Duration,
    mut open: O,
) -> Result<(i32, S), CaptureError>
where
    S: FrameSource,
    O: FnMut(i32) -> Result<S>,
{
    if indices.is_empty() {
        return Err(CaptureError::NoCameras);
    }

    for (attempt, &index) in indices.iter().enumerate() {
        if attempt > 0 {
            info!("Trying camera index {}...", index);
        }

        let source = match open(index) {
            Ok(source) => source,
            Err(e) => {
                warn!("Failed to open camera {}: {}", index, e);
                continue;
            }
        };

        // Give the device time to start before checking it
        if !warmup.is_zero() {
            std::thread::sleep(warmup);
        }

        match source.is_opened() {
            Ok(true) => {
                info!("Camera {} opened", index);
                return Ok((index, source));
            }
            Ok(false) => warn!("Cannot access camera at index {}", index),
            Err(e) => warn!("Camera {} status check failed: {}", index, e),
        }
    }

    Err(CaptureError::Unavailable {
        tried: indices.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeCamera {
        opened: bool,
    }

    impl FrameSource for FakeCamera {
        type Frame = ();

        fn is_opened(&self) -> Result<bool> {
            Ok(self.opened)
        }

        fn read(&mut self) -> Result<Option<()>> {
            Ok(Some(()))
        }
    }

    #[test]
    fn test_first_camera_used_when_available() {
        let mut attempts = Vec::new();
        let (index, _) = open_with_fallback(&[0, 1], Duration::ZERO, |i| {
            attempts.push(i);
            Ok(FakeCamera { opened: true })
        })
        .unwrap();
        assert_eq!(index, 0);
        assert_eq!(attempts, vec![0]);
    }

    #[test]
    fn test_falls_back_to_second_index() {
        let mut attempts = Vec::new();
        let (index, _) = open_with_fallback(&[0, 1], Duration::ZERO, |i| {
            attempts.push(i);
            Ok(FakeCamera { opened: i == 1 })
        })
        .unwrap();
        assert_eq!(index, 1);
        assert_eq!(attempts, vec![0, 1]);
    }

    #[test]
    fn test_open_error_is_skipped() {
        let (index, _) = open_with_fallback(&[0, 1], Duration::ZERO, |i| {
            if i == 0 {
                anyhow::bail!("device busy");
            }
            Ok(FakeCamera { opened: true })
        })
        .unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_each_index_tried_once() {
        let mut attempts = 0;
        let result = open_with_fallback(&[0, 1], Duration::ZERO, |_| {
            attempts += 1;
            Ok(FakeCamera { opened: false })
        });
        assert_eq!(attempts, 2);
        match result {
            Err(CaptureError::Unavailable { tried }) => assert_eq!(tried, vec![0, 1]),
            other => panic!("unexpected result: {:?}", other.map(|(i, _)| i)),
        }
    }

    #[test]
    fn test_no_indices() {
        let result = open_with_fallback(&[], Duration::ZERO, |_| Ok(FakeCamera { opened: true }));
        assert!(matches!(result, Err(CaptureError::NoCameras)));
    }
}
