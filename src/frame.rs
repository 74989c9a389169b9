//! Frame and stream metadata shared by sources, sinks and the pipeline.

use image::RgbImage;
use serde::Serialize;

use crate::error::{Error, Result};

/// Decoded 8-bit RGB frame.
pub type Frame = RgbImage;

/// Frame rate assumed when a container does not report one.
pub const DEFAULT_FPS: f64 = 30.0;

/// Properties of an opened video stream.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VideoMetadata {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    /// Reported frame count; 0 when the container does not know it.
    pub frame_count: u64,
}

impl VideoMetadata {
    pub fn new(fps: f64, width: u32, height: u32, frame_count: u64) -> Self {
        Self {
            fps,
            width,
            height,
            frame_count,
        }
    }

    /// Reported fps, or `DEFAULT_FPS` when missing or nonsensical.
    pub fn effective_fps(&self) -> f64 {
        if self.fps.is_finite() && self.fps > 0.0 {
            self.fps
        } else {
            DEFAULT_FPS
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.fps.is_finite() && self.fps > 0.0 {
            self.frame_count as f64 / self.fps
        } else {
            0.0
        }
    }

    /// Reject streams that report a zero frame size.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::video_open(format!(
                "stream reports invalid frame size {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    pub fn matches(&self, frame: &Frame) -> bool {
        frame.width() == self.width && frame.height() == self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_and_fps_fallback() {
        let meta = VideoMetadata::new(25.0, 640, 480, 100);
        assert_eq!(meta.duration_secs(), 4.0);
        assert_eq!(meta.effective_fps(), 25.0);

        let unknown = VideoMetadata::new(0.0, 640, 480, 100);
        assert_eq!(unknown.duration_secs(), 0.0);
        assert_eq!(unknown.effective_fps(), DEFAULT_FPS);
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(VideoMetadata::new(30.0, 0, 480, 10).validate().is_err());
        assert!(VideoMetadata::new(30.0, 640, 0, 10).validate().is_err());
        assert!(VideoMetadata::new(30.0, 1, 1, 0).validate().is_ok());
    }
}
