//! Overlay text.
//!
//! With the `opencv` feature labels are rendered with `imgproc::put_text` in the Hershey
//! simplex face; otherwise the built-in bitmap font is used. Both share the same layout
//! contract: `scale` is the label size step and `y` the top of the text box.

#[cfg(not(feature = "opencv"))]
pub use crate::annotate::font::{draw_text, text_size};

#[cfg(feature = "opencv")]
pub use hershey::{draw_text, text_size};

#[cfg(feature = "opencv")]
mod hershey {
    use crate::annotate::font;
    use image::{Rgb, RgbImage};
    use opencv::core::{Mat, Point, Scalar, CV_8UC3};
    use opencv::imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_AA};
    use opencv::prelude::*;

    /// Hershey scale per size step; step 2 is the usual 0.5 label size.
    const SCALE_STEP: f64 = 0.25;

    fn face_scale(scale: u32) -> f64 {
        scale.max(1) as f64 * SCALE_STEP
    }

    fn thickness(scale: u32) -> i32 {
        (scale as i32 / 2).max(1)
    }

    pub fn text_size(text: &str, scale: u32) -> (u32, u32) {
        let mut baseline = 0;
        match imgproc::get_text_size(
            text,
            FONT_HERSHEY_SIMPLEX,
            face_scale(scale),
            thickness(scale),
            &mut baseline,
        ) {
            Ok(size) => (size.width.max(0) as u32, size.height.max(0) as u32),
            Err(err) => {
                log::warn!("get_text_size failed ({err}); using bitmap metrics");
                font::text_size(text, scale)
            }
        }
    }

    pub fn draw_text(img: &mut RgbImage, text: &str, x: i32, y: i32, scale: u32, color: Rgb<u8>) {
        if let Err(err) = put_text(img, text, x, y, scale, color) {
            log::warn!("put_text failed ({err}); falling back to bitmap font");
            font::draw_text(img, text, x, y, scale, color);
        }
    }

    fn put_text(
        img: &mut RgbImage,
        text: &str,
        x: i32,
        y: i32,
        scale: u32,
        color: Rgb<u8>,
    ) -> opencv::Result<()> {
        let (_, h) = text_size(text, scale);
        let mut mat = Mat::new_rows_cols_with_default(
            img.height() as i32,
            img.width() as i32,
            CV_8UC3,
            Scalar::all(0.0),
        )?;
        mat.data_bytes_mut()?.copy_from_slice(img.as_raw());
        // The Mat holds RGB, so the scalar is given in the same order.
        let [r, g, b] = color.0;
        imgproc::put_text(
            &mut mat,
            text,
            Point::new(x, y + h as i32),
            FONT_HERSHEY_SIMPLEX,
            face_scale(scale),
            Scalar::new(r as f64, g as f64, b as f64, 0.0),
            thickness(scale),
            LINE_AA,
            false,
        )?;
        img.copy_from_slice(mat.data_bytes()?);
        Ok(())
    }
}
