//! Synthetic scenes for `stub://` inputs and tests.
//!
//! A scene is a flat background with at most one solid block that appears at scripted
//! positions. Frames are generated on demand and are fully deterministic.

use image::Rgb;

use crate::error::Result;
use crate::frame::{Frame, VideoMetadata};
use crate::geometry::Point;
use crate::ingest::FrameSource;

/// A solid block placed by top-left corner; `None` entries leave the frame empty.
#[derive(Clone, Debug)]
pub struct Mover {
    pub width: u32,
    pub height: u32,
    pub color: Rgb<u8>,
    /// Top-left per frame index. Frames past the end of the path have no block.
    pub path: Vec<Option<Point>>,
}

impl Mover {
    fn position(&self, index: u64) -> Option<Point> {
        self.path.get(index as usize).copied().flatten()
    }
}

#[derive(Clone, Debug)]
pub struct SyntheticScene {
    metadata: VideoMetadata,
    background: Rgb<u8>,
    mover: Option<Mover>,
    /// Frames actually produced; may differ from the reported count.
    frames: u64,
    cursor: u64,
}

impl SyntheticScene {
    pub fn new(width: u32, height: u32, frames: u64, fps: f64, background: Rgb<u8>) -> Self {
        Self {
            metadata: VideoMetadata::new(fps, width, height, frames),
            background,
            mover: None,
            frames,
            cursor: 0,
        }
    }

    pub fn with_mover(mut self, mover: Mover) -> Self {
        self.mover = Some(mover);
        self
    }

    /// Override the frame count the scene reports (0 = unknown) without changing how many
    /// frames it yields.
    pub fn with_reported_frames(mut self, reported: u64) -> Self {
        self.metadata.frame_count = reported;
        self
    }

    /// Built-in scenes addressed as `stub://<name>`.
    pub fn preset(name: &str) -> Option<Self> {
        let gray = Rgb([40, 40, 40]);
        match name {
            "static" => Some(Self::new(320, 240, 30, 10.0, gray)),
            "walker" => {
                // A 40x90 block walks left to right in non-overlapping steps once the
                // background has settled.
                let mut path = vec![None; 8];
                path.extend((0..7).map(|k| Some(Point::new(8 + 44 * k, 80))));
                path.extend(std::iter::repeat(None).take(5));
                let frames = path.len() as u64;
                Some(
                    Self::new(320, 240, frames, 10.0, gray).with_mover(Mover {
                        width: 40,
                        height: 90,
                        color: Rgb([230, 230, 230]),
                        path,
                    }),
                )
            }
            _ => None,
        }
    }

    pub fn render(&self, index: u64) -> Frame {
        let (width, height) = (self.metadata.width, self.metadata.height);
        let mut frame = Frame::from_pixel(width, height, self.background);
        if let Some(mover) = &self.mover {
            if let Some(top_left) = mover.position(index) {
                let (fw, fh) = (width as i32, height as i32);
                let x_end = (top_left.x + mover.width as i32).min(fw);
                let y_end = (top_left.y + mover.height as i32).min(fh);
                for y in top_left.y.max(0)..y_end {
                    for x in top_left.x.max(0)..x_end {
                        frame.put_pixel(x as u32, y as u32, mover.color);
                    }
                }
            }
        }
        frame
    }
}

impl FrameSource for SyntheticScene {
    fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.cursor >= self.frames {
            return Ok(None);
        }
        let frame = self.render(self.cursor);
        self.cursor += 1;
        Ok(Some(frame))
    }
}
