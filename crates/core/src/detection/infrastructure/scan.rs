//! Multi-scale sliding-window search shared by both backends.
//!
//! The pyramid starts at the configured minimum object size (candidate
//! regions below the floor are never generated) and grows by
//! [`SCAN_SCALE_STEP`] until the window no longer fits the plane. Raw
//! hits are deduplicated by IoU and optionally truncated to a maximum
//! count.

use crate::detection::infrastructure::cascade_model::{CascadeModel, IntegralImage};
use crate::shared::constants::{DEDUP_IOU_THRESHOLD, SCAN_SCALE_STEP};
use crate::shared::face_rect::FaceRect;

pub fn scan(
    gray: &[u8],
    width: u32,
    height: u32,
    model: &CascadeModel,
    min_size: (u32, u32),
    max_detections: Option<usize>,
) -> Vec<FaceRect> {
    let (base_w, base_h) = model.window_size();
    let integral = IntegralImage::new(gray, width, height);

    // The floor fixes the starting scale: windows below it do not exist.
    let mut scale = (min_size.0 as f64 / base_w as f64)
        .max(min_size.1 as f64 / base_h as f64)
        .max(1.0);

    let mut hits = Vec::new();
    loop {
        let win_w = (base_w as f64 * scale).round() as u32;
        let win_h = (base_h as f64 * scale).round() as u32;
        if win_w > width || win_h > height {
            break;
        }

        let step = (scale.round() as u32).max(2);
        let mut y = 0;
        while y + win_h <= height {
            let mut x = 0;
            while x + win_w <= width {
                if model.eval_window(&integral, x, y, scale) {
                    hits.push(FaceRect::new(x as i32, y as i32, win_w, win_h));
                }
                x += step;
            }
            y += step;
        }

        scale *= SCAN_SCALE_STEP;
    }

    let mut faces = FaceRect::deduplicate(&hits, DEDUP_IOU_THRESHOLD);
    if let Some(max) = max_detections {
        faces.truncate(max);
    }
    faces
}
