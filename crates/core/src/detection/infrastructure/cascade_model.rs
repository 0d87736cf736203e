//! Trained cascade detector asset.
//!
//! A model is a JSON description of a base detection window plus an
//! ordered list of stages; each stage votes over Haar-like rectangular
//! intensity features evaluated on an integral image. A window survives
//! detection only if every stage accepts it. Loading is construction-time
//! work: a missing or malformed file fails fast and the pipeline must not
//! start.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CascadeModelError {
    #[error("failed to read cascade model {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse cascade model {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid cascade model: {0}")]
    Invalid(String),
}

/// One weighted rectangle of a Haar-like feature, in base-window
/// coordinates.
#[derive(Clone, Debug, Deserialize)]
pub struct FeatureRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub weight: f64,
}

/// A weak classifier: a weighted sum of rectangle mean intensities,
/// variance-normalized, thresholded into a pass/fail vote.
#[derive(Clone, Debug, Deserialize)]
pub struct HaarFeature {
    pub rects: Vec<FeatureRect>,
    pub threshold: f64,
    pub pass_weight: f64,
    pub fail_weight: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Stage {
    pub threshold: f64,
    pub features: Vec<HaarFeature>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CascadeModel {
    pub window_width: u32,
    pub window_height: u32,
    pub stages: Vec<Stage>,
}

impl CascadeModel {
    pub fn load(path: &Path) -> Result<Self, CascadeModelError> {
        let text = fs::read_to_string(path).map_err(|source| CascadeModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model: CascadeModel =
            serde_json::from_str(&text).map_err(|source| CascadeModelError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        model.validate()?;
        Ok(model)
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    fn validate(&self) -> Result<(), CascadeModelError> {
        if self.window_width == 0 || self.window_height == 0 {
            return Err(CascadeModelError::Invalid(
                "detection window must be at least 1x1".into(),
            ));
        }
        for (i, stage) in self.stages.iter().enumerate() {
            for feature in &stage.features {
                if feature.rects.is_empty() {
                    return Err(CascadeModelError::Invalid(format!(
                        "stage {i} has a feature with no rectangles"
                    )));
                }
                for r in &feature.rects {
                    if r.width == 0 || r.height == 0 {
                        return Err(CascadeModelError::Invalid(format!(
                            "stage {i} has a degenerate feature rectangle"
                        )));
                    }
                    if r.x + r.width > self.window_width || r.y + r.height > self.window_height {
                        return Err(CascadeModelError::Invalid(format!(
                            "stage {i} has a feature rectangle outside the base window"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Evaluates the full cascade for a window anchored at `(x, y)` with
    /// the base window scaled by `scale`. Every stage must accept.
    pub fn eval_window(&self, integral: &IntegralImage, x: u32, y: u32, scale: f64) -> bool {
        let win_w = (self.window_width as f64 * scale).round() as u32;
        let win_h = (self.window_height as f64 * scale).round() as u32;
        if x + win_w > integral.width() || y + win_h > integral.height() {
            return false;
        }

        // Variance normalization keeps feature responses comparable
        // across lighting conditions.
        let area = (win_w as f64) * (win_h as f64);
        let mean = integral.rect_sum(x, y, win_w, win_h) as f64 / area;
        let sq_mean = integral.rect_sq_sum(x, y, win_w, win_h) as f64 / area;
        let norm = (sq_mean - mean * mean).max(1.0).sqrt();

        for stage in &self.stages {
            let mut votes = 0.0;
            for feature in &stage.features {
                let mut value = 0.0;
                for r in &feature.rects {
                    let rx = x + (r.x as f64 * scale).round() as u32;
                    let ry = y + (r.y as f64 * scale).round() as u32;
                    let rw = ((r.width as f64 * scale).round() as u32).max(1);
                    let rh = ((r.height as f64 * scale).round() as u32).max(1);
                    let rect_area = (rw as f64) * (rh as f64);
                    value += r.weight * integral.rect_sum(rx, ry, rw, rh) as f64 / rect_area;
                }
                votes += if value / norm >= feature.threshold {
                    feature.pass_weight
                } else {
                    feature.fail_weight
                };
            }
            if votes < stage.threshold {
                return false;
            }
        }
        true
    }
}

/// Summed-area tables (plain and squared) over a grayscale plane, with a
/// one-pixel zero border so rectangle sums need no edge cases.
pub struct IntegralImage {
    sum: Vec<u64>,
    sq_sum: Vec<u64>,
    width: u32,
    height: u32,
}

impl IntegralImage {
    pub fn new(gray: &[u8], width: u32, height: u32) -> Self {
        debug_assert_eq!(gray.len(), (width * height) as usize);
        let w = width as usize + 1;
        let h = height as usize + 1;
        let mut sum = vec![0u64; w * h];
        let mut sq_sum = vec![0u64; w * h];

        for y in 1..h {
            let mut row = 0u64;
            let mut sq_row = 0u64;
            for x in 1..w {
                let v = gray[(y - 1) * width as usize + (x - 1)] as u64;
                row += v;
                sq_row += v * v;
                sum[y * w + x] = sum[(y - 1) * w + x] + row;
                sq_sum[y * w + x] = sq_sum[(y - 1) * w + x] + sq_row;
            }
        }

        Self {
            sum,
            sq_sum,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rect_sum(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        Self::corners(&self.sum, self.width, x, y, w, h)
    }

    pub fn rect_sq_sum(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        Self::corners(&self.sq_sum, self.width, x, y, w, h)
    }

    fn corners(table: &[u64], width: u32, x: u32, y: u32, w: u32, h: u32) -> u64 {
        let stride = width as usize + 1;
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        table[y1 * stride + x1] + table[y0 * stride + x0]
            - table[y0 * stride + x1]
            - table[y1 * stride + x0]
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    /// A cascade with no stages: accepts every candidate window.
    /// Handy for exercising scan geometry without a trained asset.
    pub fn permissive_model_json(window: u32) -> String {
        format!(
            r#"{{ "window_width": {window}, "window_height": {window}, "stages": [] }}"#
        )
    }

    /// A cascade whose single stage can never be satisfied.
    pub fn rejecting_model_json(window: u32) -> String {
        format!(
            r#"{{
                "window_width": {window},
                "window_height": {window},
                "stages": [ {{ "threshold": 1.0, "features": [] }} ]
            }}"#
        )
    }
}
