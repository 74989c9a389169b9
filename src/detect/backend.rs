use crate::detect::result::Detection;
use crate::error::Result;
use crate::frame::Frame;

/// Classifier seam between the pipeline and whatever finds people in a frame.
///
/// Implementations may keep state across frames (a background model, a tracker) and must
/// drop it in `reset` so a fresh run over the same input produces the same detections.
pub trait RegionClassifier: Send {
    /// Classifier identifier, used in logs.
    fn name(&self) -> &'static str;

    /// Find person-like regions in `frame`.
    fn classify(&mut self, frame: &Frame) -> Result<Vec<Detection>>;

    /// Forget accumulated state before a new stream.
    fn reset(&mut self) {}
}
