//! Error types for zone-watch.

use thiserror::Error;

/// Result type alias for the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by zone construction, classification and video I/O.
///
/// End of stream and per-frame decode failures are not errors; sources report them as
/// `Ok(None)` and the pipeline returns what it has accumulated.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid zone: {0}")]
    InvalidZone(String),

    #[error("failed to open video source: {0}")]
    VideoOpen(String),

    #[error("failed to write video output: {0}")]
    VideoWrite(String),

    #[error("classifier failure: {0}")]
    Classifier(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn invalid_zone<S: Into<String>>(msg: S) -> Self {
        Self::InvalidZone(msg.into())
    }

    pub fn video_open<S: Into<String>>(msg: S) -> Self {
        Self::VideoOpen(msg.into())
    }

    pub fn video_write<S: Into<String>>(msg: S) -> Self {
        Self::VideoWrite(msg.into())
    }

    pub fn classifier<S: Into<String>>(msg: S) -> Self {
        Self::Classifier(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}
