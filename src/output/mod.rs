//! Frame sinks for annotated output.

#[cfg(feature = "ffmpeg")]
mod video;

#[cfg(feature = "ffmpeg")]
pub use video::FfmpegSink;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::frame::{Frame, VideoMetadata};

pub trait FrameSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flush and close the output. Called exactly once, also after a failed run.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        (**self).write_frame(frame)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Keeps every frame in memory.
#[derive(Default)]
pub struct MemorySink {
    pub frames: Vec<Frame>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// Writes `frame_000001.jpg`, `frame_000002.jpg`, ... into a directory.
pub struct JpegSequenceSink {
    dir: PathBuf,
    written: u64,
}

impl JpegSequenceSink {
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            Error::video_write(format!("create output directory {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir, written: 0 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl FrameSink for JpegSequenceSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let path = self.dir.join(format!("frame_{:06}.jpg", self.written + 1));
        frame
            .save_with_format(&path, image::ImageFormat::Jpeg)
            .map_err(|e| Error::video_write(format!("write {}: {}", path.display(), e)))?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        log::info!(
            "JpegSequenceSink: wrote {} frame(s) to {}",
            self.written,
            self.dir.display()
        );
        Ok(())
    }
}

/// True when `path` names a JPEG frame directory rather than a video file.
pub fn is_frame_directory(path: &str) -> bool {
    path.ends_with('/') || path.ends_with(std::path::MAIN_SEPARATOR) || Path::new(path).is_dir()
}

/// Open the sink for `path`, matching the source resolution and frame rate.
pub fn create_sink(path: &str, meta: &VideoMetadata) -> Result<Box<dyn FrameSink>> {
    if path.trim().is_empty() {
        return Err(Error::video_write("output path is empty"));
    }
    if is_frame_directory(path) {
        return Ok(Box::new(JpegSequenceSink::create(path)?));
    }
    open_video_sink(path, meta)
}

#[cfg(feature = "ffmpeg")]
fn open_video_sink(path: &str, meta: &VideoMetadata) -> Result<Box<dyn FrameSink>> {
    Ok(Box::new(FfmpegSink::create(path, meta)?))
}

#[cfg(not(feature = "ffmpeg"))]
fn open_video_sink(path: &str, _meta: &VideoMetadata) -> Result<Box<dyn FrameSink>> {
    Err(Error::video_write(format!(
        "'{}': encoding video requires the ffmpeg feature; pass a directory to write JPEG frames",
        path
    )))
}
