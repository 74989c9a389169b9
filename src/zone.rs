//! Restricted zone engine.
//!
//! A zone is either a line (treated as a corridor `LINE_BUFFER_PX` wide on each side so that
//! jittery detection centers still register) or a closed polygon. Zones are immutable once
//! built; coordinates are checked against the video resolution before a run starts.

use image::Rgb;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::annotate::{draw, text};
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::geometry::{self, Point};

/// Half-width of the corridor around a line zone, in pixels.
pub const LINE_BUFFER_PX: f64 = 20.0;

/// Overlay label drawn next to every zone.
pub const ZONE_LABEL: &str = "RESTRICTED ZONE";

const ZONE_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const ZONE_THICKNESS: u32 = 3;
const ZONE_FILL_ALPHA: f32 = 0.2;
const LINE_ENDPOINT_RADIUS: i32 = 8;
const POLYGON_VERTEX_RADIUS: i32 = 6;
const LABEL_SCALE: u32 = 2;
const LABEL_OFFSET_X: i32 = 80;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    Line,
    Polygon,
}

impl ZoneKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneKind::Line => "line",
            ZoneKind::Polygon => "polygon",
        }
    }

    /// Minimum number of points for a well-formed zone of this kind.
    pub fn min_points(&self) -> usize {
        match self {
            ZoneKind::Line => 2,
            ZoneKind::Polygon => 3,
        }
    }
}

impl FromStr for ZoneKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "line" => Ok(ZoneKind::Line),
            "polygon" => Ok(ZoneKind::Polygon),
            other => Err(Error::invalid_zone(format!(
                "zone type must be 'line' or 'polygon', got '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a zone for reporting.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ZoneInfo {
    pub kind: ZoneKind,
    pub points: Vec<Point>,
    pub num_points: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct Zone {
    kind: ZoneKind,
    points: Vec<Point>,
    /// Points as f64, cached for the geometry queries.
    shape: Vec<(f64, f64)>,
}

impl Zone {
    pub fn new(kind: ZoneKind, points: Vec<Point>) -> Result<Self> {
        if points.len() < kind.min_points() {
            return Err(Error::invalid_zone(format!(
                "{} zone requires at least {} points, got {}",
                kind,
                kind.min_points(),
                points.len()
            )));
        }
        let shape = points.iter().map(|p| p.as_f64()).collect();
        Ok(Self {
            kind,
            points,
            shape,
        })
    }

    /// Build a zone from a textual kind (`"line"` or `"polygon"`, any case).
    pub fn from_spec(kind: &str, points: Vec<Point>) -> Result<Self> {
        Self::new(kind.parse()?, points)
    }

    pub fn kind(&self) -> ZoneKind {
        self.kind
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Check that every point falls inside a `width` x `height` frame.
    pub fn validate_within(&self, width: u32, height: u32) -> Result<()> {
        validate_coordinates(&self.points, width, height)
    }

    /// Zone membership test for a detection center.
    pub fn contains(&self, point: Point) -> bool {
        let p = point.as_f64();
        match self.kind {
            ZoneKind::Line => geometry::point_polyline_distance(p, &self.shape) < LINE_BUFFER_PX,
            ZoneKind::Polygon => geometry::point_in_polygon(p, &self.shape),
        }
    }

    /// Distance to the zone geometry; 0 inside or on a polygon.
    pub fn distance_to(&self, point: Point) -> f64 {
        let p = point.as_f64();
        match self.kind {
            ZoneKind::Line => geometry::point_polyline_distance(p, &self.shape),
            ZoneKind::Polygon => geometry::point_polygon_distance(p, &self.shape),
        }
    }

    /// Whether moving from `prev` to `curr` crosses a line zone.
    ///
    /// Always false for polygons or when either position is unknown.
    pub fn crosses(&self, prev: Option<Point>, curr: Option<Point>) -> bool {
        if self.kind != ZoneKind::Line {
            return false;
        }
        let (Some(prev), Some(curr)) = (prev, curr) else {
            return false;
        };
        let (a, b) = (prev.as_f64(), curr.as_f64());
        self.shape
            .windows(2)
            .any(|w| geometry::segments_intersect(a, b, w[0], w[1]))
    }

    pub fn info(&self) -> ZoneInfo {
        let (area, length) = match self.kind {
            ZoneKind::Polygon => (Some(geometry::polygon_area(&self.shape)), None),
            ZoneKind::Line => (None, Some(geometry::polyline_length(&self.shape))),
        };
        ZoneInfo {
            kind: self.kind,
            points: self.points.clone(),
            num_points: self.points.len(),
            area,
            length,
        }
    }

    /// Draw the zone overlay and its label onto `frame`.
    pub fn render(&self, frame: &mut Frame) {
        match self.kind {
            ZoneKind::Line => self.render_line(frame),
            ZoneKind::Polygon => self.render_polygon(frame),
        }
    }

    fn render_line(&self, frame: &mut Frame) {
        for w in self.points.windows(2) {
            draw::draw_thick_line(frame, w[0], w[1], ZONE_COLOR, ZONE_THICKNESS);
        }
        let (first, last) = (self.points[0], self.points[self.points.len() - 1]);
        draw::draw_dot(frame, first, LINE_ENDPOINT_RADIUS, ZONE_COLOR);
        draw::draw_dot(frame, last, LINE_ENDPOINT_RADIUS, ZONE_COLOR);

        let second = self.points[1];
        let mid_x = (first.x + second.x) / 2;
        let mid_y = (first.y + second.y) / 2;
        let (_, text_h) = text::text_size(ZONE_LABEL, LABEL_SCALE);
        text::draw_text(
            frame,
            ZONE_LABEL,
            mid_x - LABEL_OFFSET_X,
            mid_y - 10 - text_h as i32,
            LABEL_SCALE,
            ZONE_COLOR,
        );
    }

    fn render_polygon(&self, frame: &mut Frame) {
        draw::blend_polygon(frame, &self.points, ZONE_COLOR, ZONE_FILL_ALPHA);
        let n = self.points.len();
        for i in 0..n {
            draw::draw_thick_line(
                frame,
                self.points[i],
                self.points[(i + 1) % n],
                ZONE_COLOR,
                ZONE_THICKNESS,
            );
        }
        for &p in &self.points {
            draw::draw_dot(frame, p, POLYGON_VERTEX_RADIUS, ZONE_COLOR);
        }

        let (cx, cy) = geometry::vertex_mean(&self.shape);
        let (_, text_h) = text::text_size(ZONE_LABEL, LABEL_SCALE);
        text::draw_text(
            frame,
            ZONE_LABEL,
            cx as i32 - LABEL_OFFSET_X,
            cy as i32 - text_h as i32,
            LABEL_SCALE,
            ZONE_COLOR,
        );
    }
}

/// Validate zone coordinates against the frame resolution.
///
/// Error messages name the 1-based point index and the violated bound.
pub fn validate_coordinates(points: &[Point], width: u32, height: u32) -> Result<()> {
    if points.is_empty() {
        return Err(Error::invalid_zone("no coordinates provided"));
    }
    if points.len() < 2 {
        return Err(Error::invalid_zone("at least 2 coordinates required"));
    }
    for (i, p) in points.iter().enumerate() {
        if p.x < 0 || p.x as i64 >= width as i64 {
            return Err(Error::invalid_zone(format!(
                "point {}: x coordinate {} is outside frame width (0-{})",
                i + 1,
                p.x,
                width as i64 - 1
            )));
        }
        if p.y < 0 || p.y as i64 >= height as i64 {
            return Err(Error::invalid_zone(format!(
                "point {}: y coordinate {} is outside frame height (0-{})",
                i + 1,
                p.y,
                height as i64 - 1
            )));
        }
    }
    Ok(())
}
