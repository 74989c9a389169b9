//! Planar geometry primitives used by the zone engine and the classifier.
//!
//! Everything here works on `f64` coordinates in image space (x right, y down).
//! Integer `Point`s are converted at the edges.

use serde::{Deserialize, Serialize};

const EPSILON: f64 = 1e-9;

/// Integer pixel coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn as_f64(self) -> (f64, f64) {
        (self.x as f64, self.y as f64)
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

fn sub(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    (a.0 - b.0, a.1 - b.1)
}

fn cross(a: (f64, f64), b: (f64, f64)) -> f64 {
    a.0 * b.1 - a.1 * b.0
}

fn dot(a: (f64, f64), b: (f64, f64)) -> f64 {
    a.0 * b.0 + a.1 * b.1
}

/// Orientation of `c` relative to the directed line `a -> b`: >0 left, <0 right, 0 collinear.
fn orientation(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    cross(sub(b, a), sub(c, a))
}

/// Euclidean distance between two points.
pub fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let d = sub(a, b);
    dot(d, d).sqrt()
}

/// Distance from `p` to the closed segment `a..b`. A zero-length segment is a point.
pub fn point_segment_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let ab = sub(b, a);
    let len2 = dot(ab, ab);
    if len2 < EPSILON {
        return distance(p, a);
    }
    let t = (dot(sub(p, a), ab) / len2).clamp(0.0, 1.0);
    distance(p, (a.0 + t * ab.0, a.1 + t * ab.1))
}

/// Distance from `p` to an open polyline. An empty polyline is infinitely far away.
pub fn point_polyline_distance(p: (f64, f64), line: &[(f64, f64)]) -> f64 {
    match line {
        [] => f64::INFINITY,
        [only] => distance(p, *only),
        _ => line
            .windows(2)
            .map(|w| point_segment_distance(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// True when `p` lies on the closed segment `a..b`.
pub fn point_on_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> bool {
    point_segment_distance(p, a, b) < EPSILON
}

fn within_bounds(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> bool {
    p.0 >= a.0.min(b.0) - EPSILON
        && p.0 <= a.0.max(b.0) + EPSILON
        && p.1 >= a.1.min(b.1) - EPSILON
        && p.1 <= a.1.max(b.1) + EPSILON
}

/// Closed segment intersection test. Touching endpoints and collinear overlap count.
pub fn segments_intersect(
    p1: (f64, f64),
    p2: (f64, f64),
    q1: (f64, f64),
    q2: (f64, f64),
) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);

    if ((d1 > EPSILON && d2 < -EPSILON) || (d1 < -EPSILON && d2 > EPSILON))
        && ((d3 > EPSILON && d4 < -EPSILON) || (d3 < -EPSILON && d4 > EPSILON))
    {
        return true;
    }

    (d1.abs() <= EPSILON && within_bounds(p1, q1, q2))
        || (d2.abs() <= EPSILON && within_bounds(p2, q1, q2))
        || (d3.abs() <= EPSILON && within_bounds(q1, p1, p2))
        || (d4.abs() <= EPSILON && within_bounds(q2, p1, p2))
}

/// Iterates the closed ring of polygon edges, including last -> first.
fn ring_edges(polygon: &[(f64, f64)]) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + '_ {
    let n = polygon.len();
    (0..n).map(move |i| (polygon[i], polygon[(i + 1) % n]))
}

/// True when `p` lies on any polygon edge.
pub fn point_on_polygon_boundary(p: (f64, f64), polygon: &[(f64, f64)]) -> bool {
    ring_edges(polygon).any(|(a, b)| point_on_segment(p, a, b))
}

/// Ray-casting containment. Points on the boundary are outside.
pub fn point_in_polygon(p: (f64, f64), polygon: &[(f64, f64)]) -> bool {
    if polygon.len() < 3 || point_on_polygon_boundary(p, polygon) {
        return false;
    }
    let mut inside = false;
    for (a, b) in ring_edges(polygon) {
        if (a.1 > p.1) != (b.1 > p.1) {
            let x_cross = a.0 + (p.1 - a.1) * (b.0 - a.0) / (b.1 - a.1);
            if p.0 < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

/// Distance to a polygon's area: 0 inside or on the boundary.
pub fn point_polygon_distance(p: (f64, f64), polygon: &[(f64, f64)]) -> f64 {
    if polygon.len() >= 3 && (point_in_polygon(p, polygon) || point_on_polygon_boundary(p, polygon))
    {
        return 0.0;
    }
    ring_edges(polygon)
        .map(|(a, b)| point_segment_distance(p, a, b))
        .fold(f64::INFINITY, f64::min)
}

/// Signed shoelace area; positive for counter-clockwise rings in a y-up frame.
pub fn signed_area(polygon: &[(f64, f64)]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    ring_edges(polygon).map(|(a, b)| cross(a, b)).sum::<f64>() / 2.0
}

/// Unsigned shoelace area of a closed ring.
pub fn polygon_area(polygon: &[(f64, f64)]) -> f64 {
    signed_area(polygon).abs()
}

/// Area-weighted centroid; falls back to the vertex mean for degenerate rings.
pub fn polygon_centroid(polygon: &[(f64, f64)]) -> Option<(f64, f64)> {
    if polygon.is_empty() {
        return None;
    }
    let area = signed_area(polygon);
    if area.abs() < EPSILON {
        return Some(vertex_mean(polygon));
    }
    let (mut cx, mut cy) = (0.0, 0.0);
    for (a, b) in ring_edges(polygon) {
        let f = cross(a, b);
        cx += (a.0 + b.0) * f;
        cy += (a.1 + b.1) * f;
    }
    Some((cx / (6.0 * area), cy / (6.0 * area)))
}

/// Arithmetic mean of the vertices.
pub fn vertex_mean(points: &[(f64, f64)]) -> (f64, f64) {
    let n = points.len().max(1) as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.0, sy + p.1));
    (sx / n, sy / n)
}

/// Total length of an open polyline.
pub fn polyline_length(line: &[(f64, f64)]) -> f64 {
    line.windows(2).map(|w| distance(w[0], w[1])).sum()
}
