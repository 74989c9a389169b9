//! zone-watch
//!
//! Offline restricted-zone intrusion detection for recorded video.
//!
//! # Architecture
//!
//! Frames flow one way through the pipeline:
//!
//! 1. **Ingest**: a `FrameSource` decodes frames (FFmpeg behind the `ffmpeg` feature, or a
//!    synthetic `stub://` scene).
//! 2. **Detect**: a `RegionClassifier` turns each frame into person-like `Detection`s. The
//!    built-in `MotionClassifier` uses a Gaussian-mixture background model, imageproc
//!    morphology and contour shape filters; the `opencv` feature swaps in `Mog2Classifier`.
//! 3. **Zone**: detection centers are tested against a line (buffered) or polygon `Zone`.
//! 4. **Annotate**: boxes, labels, the zone overlay and an intrusion banner are drawn.
//! 5. **Output**: a `FrameSink` writes the annotated stream (video or JPEG frames).
//!
//! `IntrusionDetector` drives the loop, counts intrusions and reports progress.
//!
//! # Module Structure
//!
//! - `geometry`: points, segments, polygons
//! - `zone`: restricted zone queries, validation and rendering
//! - `detect`: classifier trait, background model, motion and MOG2 classifiers
//! - `annotate`: overlay drawing and text rendering
//! - `ingest` / `output`: frame sources and sinks
//! - `pipeline`: the orchestrator
//! - `config`: file + environment configuration
//! - `error`: library error type

pub mod annotate;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod zone;

pub use annotate::{Annotator, Palette};
pub use config::ZoneWatchConfig;
pub use detect::{
    BoundingBox, ClassifierConfig, Detection, MotionClassifier, RegionClassifier,
};
pub use error::{Error, Result};
pub use frame::{Frame, VideoMetadata};
pub use geometry::Point;
pub use ingest::{FileSource, FrameSource, SyntheticScene};
pub use output::{create_sink, FrameSink, JpegSequenceSink, MemorySink};
pub use pipeline::{FrameReport, IntrusionDetector, RunSummary};
pub use zone::{validate_coordinates, Zone, ZoneInfo, ZoneKind};
