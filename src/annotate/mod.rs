//! Frame annotation: zone overlay, detection boxes, labels and the intrusion banner.

pub mod draw;
pub mod font;
pub mod text;

use image::Rgb;

use crate::detect::Detection;
use crate::frame::Frame;
use crate::zone::Zone;

pub const BANNER_TEXT: &str = "INTRUSION DETECTED!";

const BOX_THICKNESS: u32 = 2;
const CENTER_RADIUS: i32 = 5;
const LABEL_SCALE: u32 = 2;
const BANNER_SCALE: u32 = 3;
const BANNER_BASELINE: i32 = 50;
const BANNER_PADDING: i32 = 10;

/// Colors used for the overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    pub person: Rgb<u8>,
    pub intrusion: Rgb<u8>,
    pub text: Rgb<u8>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            person: Rgb([0, 255, 0]),
            intrusion: Rgb([255, 0, 0]),
            text: Rgb([255, 255, 255]),
        }
    }
}

pub struct Annotator {
    zone: Zone,
    palette: Palette,
    /// Max per-axis top-left offset for a detection to be drawn as an intrusion.
    match_tolerance: i32,
}

impl Annotator {
    pub fn new(zone: Zone) -> Self {
        Self {
            zone,
            palette: Palette::default(),
            match_tolerance: 10,
        }
    }

    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Whether `detection` should be drawn as one of `intrusions`.
    ///
    /// Matching is by top-left corner proximity, not identity.
    pub fn is_intrusion(&self, detection: &Detection, intrusions: &[Detection]) -> bool {
        let a = detection.bbox.top_left();
        intrusions.iter().any(|other| {
            let b = other.bbox.top_left();
            (a.x - b.x).abs() < self.match_tolerance && (a.y - b.y).abs() < self.match_tolerance
        })
    }

    pub fn draw(&self, frame: &mut Frame, detections: &[Detection], intrusions: &[Detection]) {
        self.zone.render(frame);
        for detection in detections {
            let color = if self.is_intrusion(detection, intrusions) {
                self.palette.intrusion
            } else {
                self.palette.person
            };
            self.draw_detection(frame, detection, color);
        }
        if !intrusions.is_empty() {
            self.draw_banner(frame);
        }
    }

    fn draw_detection(&self, frame: &mut Frame, detection: &Detection, color: Rgb<u8>) {
        let b = detection.bbox;
        draw::draw_box(frame, b.x1, b.y1, b.x2, b.y2, color, BOX_THICKNESS);

        let label = format!("Person: {:.2}", detection.confidence);
        let (w, h) = text::text_size(&label, LABEL_SCALE);
        let (w, h) = (w as i32, h as i32);
        draw::fill_rect(frame, b.x1, b.y1 - h - 10, b.x1 + w, b.y1, color);
        text::draw_text(frame, &label, b.x1, b.y1 - 5 - h, LABEL_SCALE, self.palette.text);

        draw::draw_dot(frame, detection.center(), CENTER_RADIUS, color);
    }

    fn draw_banner(&self, frame: &mut Frame) {
        // Shrink the banner on narrow frames.
        let scale = (1..=BANNER_SCALE)
            .rev()
            .find(|&s| {
                let (w, _) = text::text_size(BANNER_TEXT, s);
                w as i32 + 2 * BANNER_PADDING <= frame.width() as i32
            })
            .unwrap_or(1);
        let (w, h) = text::text_size(BANNER_TEXT, scale);
        let (w, h) = (w as i32, h as i32);
        let x = (frame.width() as i32 - w) / 2;
        let top = BANNER_BASELINE - h;
        draw::fill_rect(
            frame,
            x - BANNER_PADDING,
            top - BANNER_PADDING,
            x + w + BANNER_PADDING,
            BANNER_BASELINE + BANNER_PADDING,
            self.palette.intrusion,
        );
        text::draw_text(frame, BANNER_TEXT, x, top, scale, self.palette.text);
    }
}
