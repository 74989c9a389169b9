//! Frame sources.
//!
//! - Local video files decoded with FFmpeg (feature: ffmpeg)
//! - Synthetic `stub://` scenes (testing, demos)
//!
//! Sources report end of stream as `Ok(None)`. A decode failure mid-stream also ends the
//! stream; only failures to open a source are errors.

pub mod file;
#[cfg(feature = "ffmpeg")]
pub(crate) mod file_ffmpeg;
pub mod synthetic;

pub use file::{FileSource, FileStats};
pub use synthetic::{Mover, SyntheticScene};

use crate::error::Result;
use crate::frame::{Frame, VideoMetadata};

pub trait FrameSource {
    /// Stream properties as reported when the source was opened.
    fn metadata(&self) -> VideoMetadata;

    /// Next decoded frame in presentation order, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn metadata(&self) -> VideoMetadata {
        (**self).metadata()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }
}
