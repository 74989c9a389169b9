//! Motion-based person classifier.
//!
//! Pipeline per frame: background subtraction, optional shadow suppression, an ellipse
//! open/close to clean the mask, then external contours scored by area, aspect ratio and
//! height. Confidence grows linearly with contour area up to a cap.

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::morphology::{grayscale_close, grayscale_open, Mask};
use imageproc::point::Point as ContourPoint;
use serde::{Deserialize, Serialize};

use crate::detect::background::{BackgroundConfig, BackgroundModel, SHADOW};
use crate::detect::backend::RegionClassifier;
use crate::detect::result::{BoundingBox, Detection};
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::geometry;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Minimum confidence for a region to be reported.
    pub confidence_threshold: f32,
    /// Exclusive lower bound on contour area.
    pub min_area: f64,
    /// Inclusive upper bound on contour area.
    pub max_area: f64,
    /// Exclusive bounds on bounding-box width / height.
    pub min_aspect: f64,
    pub max_aspect: f64,
    /// Exclusive lower bound on bounding-box height.
    pub min_height: u32,
    /// Area that maps to confidence 1.0 before capping.
    pub confidence_area_scale: f64,
    pub max_confidence: f32,
    /// Count shadow pixels as motion.
    pub shadows_as_foreground: bool,
    /// Side of the elliptical open/close kernel.
    pub morph_kernel: u32,
    pub background: BackgroundConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            min_area: 500.0,
            max_area: 50_000.0,
            min_aspect: 0.2,
            max_aspect: 1.0,
            min_height: 50,
            confidence_area_scale: 5000.0,
            max_confidence: 0.9,
            shadows_as_foreground: true,
            morph_kernel: 5,
            background: BackgroundConfig::default(),
        }
    }
}

impl ClassifierConfig {
    pub fn with_threshold(threshold: f32) -> Self {
        Self {
            confidence_threshold: threshold,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::config(format!(
                "confidence threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if self.min_area >= self.max_area {
            return Err(Error::config("min_area must be below max_area"));
        }
        if self.min_aspect >= self.max_aspect {
            return Err(Error::config("min_aspect must be below max_aspect"));
        }
        if self.confidence_area_scale <= 0.0 {
            return Err(Error::config("confidence_area_scale must be positive"));
        }
        if !(1..=255).contains(&self.morph_kernel) {
            return Err(Error::config(format!(
                "morph_kernel must be within [1, 255], got {}",
                self.morph_kernel
            )));
        }
        if self.background.history == 0 {
            return Err(Error::config("background history must be at least 1"));
        }
        Ok(())
    }

    /// Score a candidate region; `None` when it fails a shape filter or the threshold.
    pub fn score_region(&self, area: f64, width: u32, height: u32) -> Option<f32> {
        if area <= self.min_area || area > self.max_area {
            return None;
        }
        if height <= self.min_height {
            return None;
        }
        let aspect = width as f64 / height as f64;
        if aspect <= self.min_aspect || aspect >= self.max_aspect {
            return None;
        }
        let confidence = ((area / self.confidence_area_scale) as f32).min(self.max_confidence);
        (confidence >= self.confidence_threshold).then_some(confidence)
    }

    /// Score a closed contour by its shoelace area and inclusive bounding box.
    pub fn score_contour(&self, points: &[ContourPoint<i32>]) -> Option<Detection> {
        let min_x = points.iter().map(|p| p.x).min()?;
        let max_x = points.iter().map(|p| p.x).max()?;
        let min_y = points.iter().map(|p| p.y).min()?;
        let max_y = points.iter().map(|p| p.y).max()?;
        let (w, h) = ((max_x - min_x + 1) as u32, (max_y - min_y + 1) as u32);
        let ring: Vec<(f64, f64)> = points.iter().map(|p| (p.x as f64, p.y as f64)).collect();
        let confidence = self.score_region(geometry::polygon_area(&ring), w, h)?;
        Some(Detection::new(
            BoundingBox::from_xywh(min_x, min_y, w, h),
            confidence,
        ))
    }
}

/// Filled ellipse inscribed in a `size` x `size` square, nonzero inside.
///
/// Matches the usual elliptical structuring element: for 5x5 the top and bottom rows hold
/// only the center pixel and the three middle rows are full.
pub fn ellipse_element(size: u32) -> GrayImage {
    let size = size.max(1);
    let r = (size / 2) as i32;
    let mut element = GrayImage::new(size, size);
    for row in 0..size as i32 {
        let dy = row - r;
        let half = if r > 0 {
            let t = ((r * r - dy * dy) as f64 / (r * r) as f64).max(0.0);
            (r as f64 * t.sqrt()).round() as i32
        } else {
            0
        };
        let (start, end) = if r > 0 {
            ((r - half).max(0), (r + half + 1).min(size as i32))
        } else {
            (0, size as i32)
        };
        for col in start..end {
            element.put_pixel(col as u32, row as u32, Luma([255]));
        }
    }
    element
}

fn ellipse_mask(size: u32) -> Mask {
    let size = size.clamp(1, 255);
    let center = (size / 2) as u8;
    Mask::from_image(&ellipse_element(size), center, center)
}

/// Outer borders of the top-level foreground regions of `mask`.
///
/// The mask is traced inside a one-pixel zero frame so regions touching the image edge
/// still get an outer border; points are reported in `mask` coordinates.
pub fn outer_contours(mask: &GrayImage) -> Vec<Vec<ContourPoint<i32>>> {
    let mut padded = GrayImage::new(mask.width() + 2, mask.height() + 2);
    image::imageops::replace(&mut padded, mask, 1, 1);
    find_contours::<i32>(&padded)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            c.points
                .into_iter()
                .map(|p| ContourPoint::new(p.x - 1, p.y - 1))
                .collect()
        })
        .collect()
}

pub struct MotionClassifier {
    config: ClassifierConfig,
    background: BackgroundModel,
    kernel: Mask,
}

impl MotionClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        let background = BackgroundModel::new(config.background.clone());
        let kernel = ellipse_mask(config.morph_kernel);
        Self {
            config,
            background,
            kernel,
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Update the background model with `frame` and return the cleaned motion mask.
    pub fn foreground_mask(&mut self, frame: &Frame) -> GrayImage {
        let mut mask = self.background.apply(frame);
        if !self.config.shadows_as_foreground {
            for p in mask.pixels_mut() {
                if p[0] == SHADOW {
                    p[0] = 0;
                }
            }
        }
        let opened = grayscale_open(&mask, &self.kernel);
        grayscale_close(&opened, &self.kernel)
    }

    /// Score the external contours of a motion mask.
    pub fn regions_in(&self, mask: &GrayImage) -> Vec<Detection> {
        outer_contours(mask)
            .iter()
            .filter_map(|points| self.config.score_contour(points))
            .collect()
    }
}

impl RegionClassifier for MotionClassifier {
    fn name(&self) -> &'static str {
        "motion"
    }

    fn classify(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let mask = self.foreground_mask(frame);
        let detections = self.regions_in(&mask);
        log::trace!(
            "motion classifier: {} region(s) after {} frame(s)",
            detections.len(),
            self.background.frames_seen()
        );
        Ok(detections)
    }

    fn reset(&mut self) {
        self.background.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn score_region_applies_each_filter() {
        let cfg = ClassifierConfig::default();
        // 2000 / 5000 = 0.4 < 0.5.
        assert_eq!(cfg.score_region(2000.0, 30, 60), None);
        assert_eq!(cfg.score_region(3000.0, 30, 60), Some(0.6));
        assert_eq!(cfg.score_region(10_000.0, 30, 60), Some(0.9));
        assert_eq!(cfg.score_region(50_000.0, 30, 60), Some(0.9));
        assert_eq!(cfg.score_region(50_001.0, 30, 60), None);
        assert_eq!(cfg.score_region(500.0, 30, 60), None);
        // Square and too-thin boxes.
        assert_eq!(cfg.score_region(3000.0, 60, 60), None);
        assert_eq!(cfg.score_region(3000.0, 12, 60), None);
        // Too short.
        assert_eq!(cfg.score_region(3000.0, 25, 50), None);

        let lenient = ClassifierConfig::with_threshold(0.3);
        assert_eq!(lenient.score_region(2000.0, 30, 60), Some(0.4));
    }

    #[test]
    fn validate_rejects_bad_threshold() {
        assert!(ClassifierConfig::default().validate().is_ok());
        assert!(ClassifierConfig::with_threshold(1.5).validate().is_err());
        assert!(ClassifierConfig::with_threshold(-0.1).validate().is_err());
    }

    #[test]
    fn regions_in_reports_upright_blob() {
        let classifier = MotionClassifier::new(ClassifierConfig::with_threshold(0.3));
        let mut mask = GrayImage::new(200, 150);
        for y in 40..110 {
            for x in 50..90 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        // Small speck is filtered by area.
        mask.put_pixel(5, 5, Luma([255]));

        let found = classifier.regions_in(&mask);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].bbox, BoundingBox::new(50, 40, 90, 110));
        // Contour through pixel centers: 39 x 69.
        assert!((found[0].confidence - (39.0 * 69.0 / 5000.0) as f32).abs() < 1e-6);
    }

    #[test]
    fn regions_touching_any_frame_edge_are_reported() {
        let classifier = MotionClassifier::new(ClassifierConfig::with_threshold(0.3));
        for (x0, y0) in [(0, 40), (260, 40), (100, 0), (100, 130), (0, 0)] {
            let mut mask = GrayImage::new(300, 200);
            for y in y0..y0 + 70 {
                for x in x0..x0 + 40 {
                    mask.put_pixel(x, y, Luma([255]));
                }
            }
            let found = classifier.regions_in(&mask);
            assert_eq!(found.len(), 1, "blob at ({x0}, {y0})");
            assert_eq!(
                found[0].bbox,
                BoundingBox::new(x0 as i32, y0 as i32, x0 as i32 + 40, y0 as i32 + 70)
            );
        }
    }

    #[test]
    fn ellipse_element_matches_5x5_shape() {
        let element = ellipse_element(5);
        let rows: Vec<Vec<u8>> = (0..5)
            .map(|y| (0..5).map(|x| u8::from(element.get_pixel(x, y)[0] != 0)).collect())
            .collect();
        assert_eq!(rows[0], vec![0, 0, 1, 0, 0]);
        assert_eq!(rows[1], vec![1, 1, 1, 1, 1]);
        assert_eq!(rows[2], vec![1, 1, 1, 1, 1]);
        assert_eq!(rows[3], vec![1, 1, 1, 1, 1]);
        assert_eq!(rows[4], vec![0, 0, 1, 0, 0]);
        assert_eq!(ellipse_element(1).pixels().filter(|p| p[0] != 0).count(), 1);
    }

    #[test]
    fn cleaning_removes_specks_and_keeps_blobs() {
        let kernel = ellipse_mask(5);
        let mut mask = GrayImage::new(60, 60);
        for y in 10..40 {
            for x in 10..30 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        mask.put_pixel(50, 50, Luma([255]));
        let cleaned = grayscale_close(&grayscale_open(&mask, &kernel), &kernel);
        assert_eq!(cleaned.get_pixel(50, 50)[0], 0);
        assert_eq!(cleaned.get_pixel(20, 25)[0], 255);
    }

    #[test]
    fn validate_bounds_kernel_size() {
        let mut cfg = ClassifierConfig::default();
        cfg.morph_kernel = 0;
        assert!(cfg.validate().is_err());
        cfg.morph_kernel = 300;
        assert!(cfg.validate().is_err());
        cfg.morph_kernel = 7;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn static_frames_produce_no_detections() {
        let mut classifier = MotionClassifier::new(ClassifierConfig::default());
        let frame = RgbImage::from_pixel(120, 100, Rgb([60, 60, 60]));
        for _ in 0..5 {
            assert!(classifier.classify(&frame).unwrap().is_empty());
        }
    }

    #[test]
    fn reset_restarts_background() {
        let mut classifier = MotionClassifier::new(ClassifierConfig::default());
        let frame = RgbImage::from_pixel(40, 40, Rgb([60, 60, 60]));
        classifier.classify(&frame).unwrap();
        classifier.classify(&frame).unwrap();
        classifier.reset();
        let mask = classifier.foreground_mask(&frame);
        assert!(mask.pixels().all(|p| p[0] != 0));
    }
}
