//! Person detection.
//!
//! `RegionClassifier` is the seam the pipeline talks to. `MotionClassifier` is the built-in
//! implementation, a background-subtraction heuristic that flags upright moving blobs;
//! with the `opencv` feature `Mog2Classifier` runs the same stages through OpenCV.

mod backend;
pub mod background;
#[cfg(feature = "opencv")]
mod mog2;
mod motion;
mod result;

pub use backend::RegionClassifier;
pub use background::{BackgroundConfig, BackgroundModel};
#[cfg(feature = "opencv")]
pub use mog2::Mog2Classifier;
pub use motion::{
    ellipse_element, outer_contours, ClassifierConfig, MotionClassifier,
    DEFAULT_CONFIDENCE_THRESHOLD,
};
pub use result::{BoundingBox, Detection};

use crate::error::Result;

/// The classifier `IntrusionDetector::new` uses: OpenCV MOG2 when built with `opencv`,
/// the built-in motion classifier otherwise.
pub fn default_classifier(config: ClassifierConfig) -> Result<Box<dyn RegionClassifier>> {
    config.validate()?;
    #[cfg(feature = "opencv")]
    {
        Ok(Box::new(Mog2Classifier::new(config)?))
    }
    #[cfg(not(feature = "opencv"))]
    {
        Ok(Box::new(MotionClassifier::new(config)))
    }
}
