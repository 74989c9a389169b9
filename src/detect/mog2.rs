//! OpenCV-backed motion classifier (feature: opencv).
//!
//! Same stages and thresholds as `MotionClassifier`, with MOG2 background subtraction,
//! `morphology_ex` and external contour extraction done by OpenCV.

use image::{GrayImage, RgbImage};
use opencv::core::{Mat, Point, Ptr, Scalar, Size, Vector, BORDER_CONSTANT, CV_8UC3};
use opencv::imgproc::{
    self, CHAIN_APPROX_NONE, MORPH_CLOSE, MORPH_ELLIPSE, MORPH_OPEN, RETR_EXTERNAL,
    THRESH_BINARY,
};
use opencv::prelude::*;
use opencv::video::{self, BackgroundSubtractorMOG2};

use crate::detect::backend::RegionClassifier;
use crate::detect::motion::ClassifierConfig;
use crate::detect::result::{BoundingBox, Detection};
use crate::error::{Error, Result};
use crate::frame::Frame;

/// Mask values above this are foreground; MOG2 marks shadows with 127.
const FOREGROUND_CUTOFF: f64 = 200.0;

pub struct Mog2Classifier {
    config: ClassifierConfig,
    /// Created on first use and dropped by `reset`.
    subtractor: Option<Ptr<BackgroundSubtractorMOG2>>,
    kernel: Mat,
}

fn cv_error(err: opencv::Error) -> Error {
    Error::classifier(format!("opencv: {err}"))
}

impl Mog2Classifier {
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        let side = config.morph_kernel as i32;
        let kernel =
            imgproc::get_structuring_element(MORPH_ELLIPSE, Size::new(side, side), Point::new(-1, -1))
                .map_err(cv_error)?;
        Ok(Self {
            config,
            subtractor: None,
            kernel,
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    fn subtractor(&mut self) -> opencv::Result<&mut Ptr<BackgroundSubtractorMOG2>> {
        if self.subtractor.is_none() {
            let bg = &self.config.background;
            let mut subtractor = video::create_background_subtractor_mog2(
                bg.history as i32,
                bg.var_threshold as f64,
                bg.detect_shadows,
            )?;
            subtractor.set_n_mixtures(bg.max_modes as i32)?;
            subtractor.set_var_threshold_gen(bg.var_threshold_gen as f64)?;
            subtractor.set_background_ratio(bg.background_ratio as f64)?;
            subtractor.set_var_init(bg.var_init as f64)?;
            subtractor.set_var_min(bg.var_min as f64)?;
            subtractor.set_var_max(bg.var_max as f64)?;
            subtractor.set_complexity_reduction_threshold(bg.complexity_reduction as f64)?;
            subtractor.set_shadow_threshold(bg.shadow_threshold as f64)?;
            self.subtractor = Some(subtractor);
        }
        match self.subtractor.as_mut() {
            Some(subtractor) => Ok(subtractor),
            None => Err(opencv::Error::new(
                opencv::core::StsError,
                "background subtractor unavailable",
            )),
        }
    }

    fn morph(&self, src: &Mat, op: i32) -> opencv::Result<Mat> {
        let mut dst = Mat::default();
        imgproc::morphology_ex(
            src,
            &mut dst,
            op,
            &self.kernel,
            Point::new(-1, -1),
            1,
            BORDER_CONSTANT,
            imgproc::morphology_default_border_value()?,
        )?;
        Ok(dst)
    }

    fn cleaned_mask(&mut self, frame: &RgbImage) -> opencv::Result<Mat> {
        let mut input = Mat::new_rows_cols_with_default(
            frame.height() as i32,
            frame.width() as i32,
            CV_8UC3,
            Scalar::all(0.0),
        )?;
        input.data_bytes_mut()?.copy_from_slice(frame.as_raw());

        let rate = self
            .config
            .background
            .learning_rate
            .map(f64::from)
            .unwrap_or(-1.0);
        let mut raw = Mat::default();
        self.subtractor()?.apply(&input, &mut raw, rate)?;

        let mask = if self.config.shadows_as_foreground {
            raw
        } else {
            let mut binary = Mat::default();
            imgproc::threshold(&raw, &mut binary, FOREGROUND_CUTOFF, 255.0, THRESH_BINARY)?;
            binary
        };
        let opened = self.morph(&mask, MORPH_OPEN)?;
        self.morph(&opened, MORPH_CLOSE)
    }

    /// Update the background model with `frame` and return the cleaned motion mask.
    pub fn foreground_mask(&mut self, frame: &Frame) -> Result<GrayImage> {
        let mask = self.cleaned_mask(frame).map_err(cv_error)?;
        let bytes = mask.data_bytes().map_err(cv_error)?.to_vec();
        GrayImage::from_raw(frame.width(), frame.height(), bytes)
            .ok_or_else(|| Error::classifier("foreground mask size does not match the frame"))
    }

    fn regions(&self, mask: &Mat) -> opencv::Result<Vec<Detection>> {
        let mut contours: Vector<Vector<Point>> = Vector::new();
        imgproc::find_contours(
            mask,
            &mut contours,
            RETR_EXTERNAL,
            CHAIN_APPROX_NONE,
            Point::new(0, 0),
        )?;

        let mut detections = Vec::new();
        for contour in contours.iter() {
            let area = imgproc::contour_area(&contour, false)?;
            let rect = imgproc::bounding_rect(&contour)?;
            let (w, h) = (rect.width.max(0) as u32, rect.height.max(0) as u32);
            if let Some(confidence) = self.config.score_region(area, w, h) {
                detections.push(Detection::new(
                    BoundingBox::from_xywh(rect.x, rect.y, w, h),
                    confidence,
                ));
            }
        }
        Ok(detections)
    }
}

impl RegionClassifier for Mog2Classifier {
    fn name(&self) -> &'static str {
        "mog2"
    }

    fn classify(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let mask = self.cleaned_mask(frame).map_err(cv_error)?;
        let detections = self.regions(&mask).map_err(cv_error)?;
        log::trace!("mog2 classifier: {} region(s)", detections.len());
        Ok(detections)
    }

    fn reset(&mut self) {
        self.subtractor = None;
    }
}
