//! Clipped drawing primitives on top of `imageproc::drawing`.

use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
    draw_polygon_mut,
};
use imageproc::point::Point as PolyPoint;
use imageproc::rect::Rect;

use crate::geometry::Point;

/// Rect spanning the inclusive corners, normalized so width and height are at least one.
fn span(x1: i32, y1: i32, x2: i32, y2: i32) -> Rect {
    let (left, right) = (x1.min(x2), x1.max(x2));
    let (top, bottom) = (y1.min(y2), y1.max(y2));
    Rect::at(left, top).of_size((right - left + 1) as u32, (bottom - top + 1) as u32)
}

/// Solid rectangle between inclusive corners.
pub fn fill_rect(img: &mut RgbImage, x1: i32, y1: i32, x2: i32, y2: i32, color: Rgb<u8>) {
    draw_filled_rect_mut(img, span(x1, y1, x2, y2), color);
}

/// Rectangle outline between inclusive corners, growing inward by `thickness`.
pub fn draw_box(
    img: &mut RgbImage,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    color: Rgb<u8>,
    thickness: u32,
) {
    let (left, right) = (x1.min(x2), x1.max(x2));
    let (top, bottom) = (y1.min(y2), y1.max(y2));
    for inset in 0..thickness.max(1) as i32 {
        if left + inset > right - inset || top + inset > bottom - inset {
            break;
        }
        draw_hollow_rect_mut(
            img,
            span(left + inset, top + inset, right - inset, bottom - inset),
            color,
        );
    }
}

/// Line of `thickness` pixels built from parallel one-pixel segments.
pub fn draw_thick_line(img: &mut RgbImage, a: Point, b: Point, color: Rgb<u8>, thickness: u32) {
    let (ax, ay) = (a.x as f32, a.y as f32);
    let (bx, by) = (b.x as f32, b.y as f32);
    let (dx, dy) = (bx - ax, by - ay);
    let len = (dx * dx + dy * dy).sqrt();
    if len < f32::EPSILON {
        draw_dot(img, a, (thickness / 2) as i32, color);
        return;
    }
    let (nx, ny) = (-dy / len, dx / len);
    let half = (thickness.max(1) - 1) as f32 / 2.0;
    for i in 0..thickness.max(1) {
        let off = i as f32 - half;
        draw_line_segment_mut(
            img,
            (ax + nx * off, ay + ny * off),
            (bx + nx * off, by + ny * off),
            color,
        );
    }
}

pub fn draw_dot(img: &mut RgbImage, center: Point, radius: i32, color: Rgb<u8>) {
    draw_filled_circle_mut(img, (center.x, center.y), radius, color);
}

/// Fill a polygon with `color` blended at `alpha` over the existing pixels.
///
/// Consecutive duplicate vertices and a closing vertex equal to the first are dropped;
/// rings left with fewer than three vertices are not filled.
pub fn blend_polygon(img: &mut RgbImage, points: &[Point], color: Rgb<u8>, alpha: f32) {
    let mut ring: Vec<PolyPoint<i32>> = Vec::with_capacity(points.len());
    for p in points {
        let q = PolyPoint::new(p.x, p.y);
        if ring.last() != Some(&q) {
            ring.push(q);
        }
    }
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    if ring.len() < 3 {
        return;
    }

    let mut overlay = img.clone();
    draw_polygon_mut(&mut overlay, &ring, color);

    let alpha = alpha.clamp(0.0, 1.0);
    for (dst, src) in img.pixels_mut().zip(overlay.pixels()) {
        if dst == src {
            continue;
        }
        for c in 0..3 {
            let mixed = dst[c] as f32 * (1.0 - alpha) + src[c] as f32 * alpha;
            dst[c] = mixed.round().clamp(0.0, 255.0) as u8;
        }
    }
}
