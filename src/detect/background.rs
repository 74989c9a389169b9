//! Adaptive per-pixel Gaussian-mixture background model.
//!
//! Each pixel keeps up to `max_modes` weighted Gaussian modes over RGB. A pixel is
//! background when it falls close to one of the heaviest modes that together account for
//! `background_ratio` of the weight. Unmatched pixels spawn a new mode; modes whose weight
//! decays below the complexity-reduction prior are dropped. Foreground pixels that look like
//! a darkened copy of a background mode are marked as shadow.
//!
//! The learning rate ramps from 1/2 on the first frame to 1/`history`, so the model settles
//! quickly at the start of a clip and then adapts slowly.

use image::{GrayImage, Luma, RgbImage};
use serde::{Deserialize, Serialize};

/// Mask value for foreground pixels.
pub const FOREGROUND: u8 = 255;
/// Mask value for pixels classified as shadow.
pub const SHADOW: u8 = 127;
/// Mask value for background pixels.
pub const BACKGROUND: u8 = 0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Number of frames the learning rate converges to.
    pub history: u32,
    pub max_modes: usize,
    /// Squared Mahalanobis threshold for the background decision.
    pub var_threshold: f32,
    /// Squared Mahalanobis threshold for matching an existing mode.
    pub var_threshold_gen: f32,
    pub background_ratio: f32,
    pub var_init: f32,
    pub var_min: f32,
    pub var_max: f32,
    pub complexity_reduction: f32,
    pub detect_shadows: bool,
    /// Darkest brightness ratio still accepted as shadow.
    pub shadow_threshold: f32,
    /// Fixed learning rate; `None` uses the automatic ramp.
    pub learning_rate: Option<f32>,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            history: 500,
            max_modes: 5,
            var_threshold: 16.0,
            var_threshold_gen: 9.0,
            background_ratio: 0.9,
            var_init: 15.0,
            var_min: 4.0,
            var_max: 75.0,
            complexity_reduction: 0.05,
            detect_shadows: true,
            shadow_threshold: 0.5,
            learning_rate: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Mode {
    weight: f32,
    mean: [f32; 3],
    var: f32,
}

pub struct BackgroundModel {
    config: BackgroundConfig,
    width: u32,
    height: u32,
    /// `max_modes` slots per pixel, sorted by descending weight.
    modes: Vec<Mode>,
    used: Vec<u8>,
    frames_seen: u64,
}

impl BackgroundModel {
    pub fn new(config: BackgroundConfig) -> Self {
        let config = BackgroundConfig {
            max_modes: config.max_modes.clamp(1, u8::MAX as usize),
            history: config.history.max(1),
            ..config
        };
        Self {
            config,
            width: 0,
            height: 0,
            modes: Vec::new(),
            used: Vec::new(),
            frames_seen: 0,
        }
    }

    pub fn config(&self) -> &BackgroundConfig {
        &self.config
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    pub fn reset(&mut self) {
        self.width = 0;
        self.height = 0;
        self.modes.clear();
        self.used.clear();
        self.frames_seen = 0;
    }

    fn learning_rate(&self) -> f32 {
        match self.config.learning_rate {
            Some(rate) if self.frames_seen > 1 => rate.clamp(0.0, 1.0),
            _ => {
                let n = (2 * self.frames_seen).min(self.config.history as u64).max(1);
                1.0 / n as f32
            }
        }
    }

    /// Update the model with `frame` and return its foreground mask.
    ///
    /// A change in frame size restarts the model.
    pub fn apply(&mut self, frame: &RgbImage) -> GrayImage {
        let (width, height) = frame.dimensions();
        if width != self.width || height != self.height {
            self.reset();
            self.width = width;
            self.height = height;
            let pixels = width as usize * height as usize;
            self.modes = vec![Mode::default(); pixels * self.config.max_modes];
            self.used = vec![0; pixels];
        }
        self.frames_seen += 1;
        let alpha = self.learning_rate();

        let k = self.config.max_modes;
        let mut mask = GrayImage::new(width, height);
        for (i, (px, out)) in frame.pixels().zip(mask.pixels_mut()).enumerate() {
            let sample = [px[0] as f32, px[1] as f32, px[2] as f32];
            let slots = &mut self.modes[i * k..(i + 1) * k];
            let value = update_pixel(&self.config, slots, &mut self.used[i], sample, alpha);
            *out = Luma([value]);
        }
        mask
    }
}

fn dist2(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    (0..3).map(|c| (a[c] - b[c]).powi(2)).sum()
}

fn update_pixel(
    cfg: &BackgroundConfig,
    slots: &mut [Mode],
    used: &mut u8,
    sample: [f32; 3],
    alpha: f32,
) -> u8 {
    let prune = -alpha * cfg.complexity_reduction;
    let mut n = *used as usize;
    let mut background = false;
    let mut matched = false;
    let mut total = 0.0f32;

    for mode in slots[..n].iter_mut() {
        let mut weight = (1.0 - alpha) * mode.weight + prune;
        if !matched {
            let d2 = dist2(&mode.mean, &sample);
            if total < cfg.background_ratio && d2 < cfg.var_threshold * mode.var {
                background = true;
            }
            if d2 < cfg.var_threshold_gen * mode.var {
                matched = true;
                weight += alpha;
                let rate = alpha / weight;
                for c in 0..3 {
                    mode.mean[c] -= rate * (mode.mean[c] - sample[c]);
                }
                mode.var = (mode.var + rate * (d2 - mode.var)).clamp(cfg.var_min, cfg.var_max);
            }
        }
        if weight < -prune {
            weight = 0.0;
        }
        mode.weight = weight;
        total += weight;
    }

    // Drop pruned modes and renormalize.
    let mut kept = 0;
    for j in 0..n {
        if slots[j].weight > 0.0 {
            slots[kept] = slots[j];
            kept += 1;
        }
    }
    n = kept;
    if total > 0.0 {
        for mode in slots[..n].iter_mut() {
            mode.weight /= total;
        }
    }

    if !matched && alpha > 0.0 {
        let slot = if n == slots.len() {
            n - 1
        } else {
            n += 1;
            n - 1
        };
        if n == 1 {
            slots[slot].weight = 1.0;
        } else {
            slots[slot].weight = alpha;
            for mode in slots[..n - 1].iter_mut() {
                mode.weight *= 1.0 - alpha;
            }
        }
        slots[slot].mean = sample;
        slots[slot].var = cfg.var_init.clamp(cfg.var_min, cfg.var_max);
    }

    slots[..n].sort_by(|a, b| b.weight.total_cmp(&a.weight));
    *used = n as u8;

    if background {
        BACKGROUND
    } else if cfg.detect_shadows && is_shadow(cfg, &slots[..n], &sample) {
        SHADOW
    } else {
        FOREGROUND
    }
}

fn is_shadow(cfg: &BackgroundConfig, modes: &[Mode], sample: &[f32; 3]) -> bool {
    let mut total = 0.0f32;
    for mode in modes {
        let num: f32 = (0..3).map(|c| sample[c] * mode.mean[c]).sum();
        let den: f32 = (0..3).map(|c| mode.mean[c] * mode.mean[c]).sum();
        if den == 0.0 {
            return false;
        }
        if num <= den && num >= cfg.shadow_threshold * den {
            let a = num / den;
            let d2: f32 = (0..3).map(|c| (a * mode.mean[c] - sample[c]).powi(2)).sum();
            if d2 < cfg.var_threshold * mode.var * a * a {
                return true;
            }
        }
        total += mode.weight;
        if total > cfg.background_ratio {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(w: u32, h: u32, v: u8) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([v, v, v]))
    }

    fn count(mask: &GrayImage, value: u8) -> usize {
        mask.pixels().filter(|p| p[0] == value).count()
    }

    #[test]
    fn static_scene_settles_to_background() {
        let mut model = BackgroundModel::new(BackgroundConfig::default());
        let first = model.apply(&solid(16, 12, 80));
        assert_eq!(count(&first, BACKGROUND), 0);
        for _ in 0..5 {
            let mask = model.apply(&solid(16, 12, 80));
            assert_eq!(count(&mask, BACKGROUND), 16 * 12);
        }
        assert_eq!(model.frames_seen(), 6);
    }

    #[test]
    fn bright_object_is_foreground_and_leaves_no_trail() {
        let mut model = BackgroundModel::new(BackgroundConfig {
            detect_shadows: false,
            ..BackgroundConfig::default()
        });
        for _ in 0..4 {
            model.apply(&solid(20, 20, 40));
        }
        let mut frame = solid(20, 20, 40);
        for y in 5..10 {
            for x in 5..10 {
                frame.put_pixel(x, y, Rgb([230, 230, 230]));
            }
        }
        let mask = model.apply(&frame);
        assert_eq!(count(&mask, FOREGROUND), 25);
        assert_eq!(mask.get_pixel(7, 7)[0], FOREGROUND);
        assert_eq!(mask.get_pixel(0, 0)[0], BACKGROUND);

        let mask = model.apply(&solid(20, 20, 40));
        assert_eq!(count(&mask, BACKGROUND), 400);
    }

    #[test]
    fn darkened_background_is_shadow() {
        let mut model = BackgroundModel::new(BackgroundConfig::default());
        for _ in 0..10 {
            model.apply(&solid(8, 8, 200));
        }
        let mask = model.apply(&solid(8, 8, 140));
        assert_eq!(count(&mask, SHADOW), 64);
    }

    #[test]
    fn resize_restarts_model() {
        let mut model = BackgroundModel::new(BackgroundConfig::default());
        model.apply(&solid(8, 8, 10));
        model.apply(&solid(8, 8, 10));
        let mask = model.apply(&solid(4, 4, 10));
        assert_eq!(mask.dimensions(), (4, 4));
        assert_eq!(model.frames_seen(), 1);
    }
}
