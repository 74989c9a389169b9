//! Local file frame source.
//!
//! `stub://<scene>` paths open a synthetic scene; anything else is decoded with FFmpeg when
//! the `ffmpeg` feature is enabled. Remote URLs are rejected.

#[cfg(feature = "ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::synthetic::SyntheticScene;
use super::FrameSource;
use crate::error::{Error, Result};
use crate::frame::{Frame, VideoMetadata};

pub struct FileSource {
    path: String,
    backend: FileBackend,
    frames_read: u64,
}

enum FileBackend {
    Synthetic(SyntheticScene),
    #[cfg(feature = "ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

/// Statistics for a file source.
#[derive(Clone, Debug)]
pub struct FileStats {
    pub frames_read: u64,
    pub path: String,
}

impl FileSource {
    pub fn open(path: &str) -> Result<Self> {
        if !is_local_file_path(path) {
            return Err(Error::video_open(format!(
                "'{}': only local paths and stub:// scenes are supported",
                path
            )));
        }
        let backend = if let Some(scene) = path.strip_prefix("stub://") {
            let scene = SyntheticScene::preset(scene).ok_or_else(|| {
                Error::video_open(format!("unknown synthetic scene '{}'", path))
            })?;
            FileBackend::Synthetic(scene)
        } else {
            open_decoded(path)?
        };

        let source = Self {
            path: path.to_string(),
            backend,
            frames_read: 0,
        };
        let meta = source.metadata();
        log::info!(
            "FileSource: opened {} ({}x{} @ {:.2} fps, {} frames)",
            path,
            meta.width,
            meta.height,
            meta.fps,
            meta.frame_count
        );
        Ok(source)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn stats(&self) -> FileStats {
        FileStats {
            frames_read: self.frames_read,
            path: self.path.clone(),
        }
    }
}

#[cfg(feature = "ffmpeg")]
fn open_decoded(path: &str) -> Result<FileBackend> {
    Ok(FileBackend::Ffmpeg(FfmpegFileSource::open(path)?))
}

#[cfg(not(feature = "ffmpeg"))]
fn open_decoded(path: &str) -> Result<FileBackend> {
    if !std::path::Path::new(path).exists() {
        return Err(Error::video_open(format!("'{}' does not exist", path)));
    }
    Err(Error::video_open(format!(
        "'{}': decoding video files requires the ffmpeg feature",
        path
    )))
}

impl FrameSource for FileSource {
    fn metadata(&self) -> VideoMetadata {
        match &self.backend {
            FileBackend::Synthetic(scene) => scene.metadata(),
            #[cfg(feature = "ffmpeg")]
            FileBackend::Ffmpeg(source) => source.metadata(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let frame = match &mut self.backend {
            FileBackend::Synthetic(scene) => scene.next_frame()?,
            #[cfg(feature = "ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame()?,
        };
        if frame.is_some() {
            self.frames_read += 1;
        } else {
            log::debug!(
                "FileSource: end of stream for {} after {} frames",
                self.path,
                self.frames_read
            );
        }
        Ok(frame)
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}
