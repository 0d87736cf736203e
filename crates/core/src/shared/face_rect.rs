/// Axis-aligned detection rectangle in frame coordinates.
///
/// Pure value type; produced fresh each cycle by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl FaceRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn iou(&self, other: &FaceRect) -> f64 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = (self.x + self.width as i32).min(other.x + other.width as i32);
        let iy2 = (self.y + self.height as i32).min(other.y + other.height as i32);

        let inter = (ix2 - ix1).max(0) as f64 * (iy2 - iy1).max(0) as f64;
        if inter == 0.0 {
            return 0.0;
        }

        let area_a = self.width as f64 * self.height as f64;
        let area_b = other.width as f64 * other.height as f64;
        inter / (area_a + area_b - inter)
    }

    /// Greedy deduplication: keeps a rectangle only if its IoU with every
    /// previously-kept rectangle is at or below the threshold.
    pub fn deduplicate(rects: &[FaceRect], iou_threshold: f64) -> Vec<FaceRect> {
        if rects.len() <= 1 {
            return rects.to_vec();
        }
        let mut kept: Vec<FaceRect> = Vec::with_capacity(rects.len());
        for r in rects {
            let dominated = kept.iter().any(|k| r.iou(k) > iou_threshold);
            if !dominated {
                kept.push(*r);
            }
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::constants::DEDUP_IOU_THRESHOLD;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn rect(x: i32, y: i32, w: u32, h: u32) -> FaceRect {
        FaceRect::new(x, y, w, h)
    }

    #[test]
    fn test_iou_identical_rects() {
        let a = rect(10, 10, 100, 100);
        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = rect(0, 0, 50, 50);
        let b = rect(100, 100, 50, 50);
        assert_relative_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        // a: [0,0]-[100,100], b: [50,0]-[150,100]
        // intersection: 50*100 = 5000, union: 15000
        let a = rect(0, 0, 100, 100);
        let b = rect(50, 0, 100, 100);
        assert_relative_eq!(a.iou(&b), 5000.0 / 15000.0);
    }

    #[test]
    fn test_iou_contained() {
        let a = rect(0, 0, 100, 100);
        let b = rect(25, 25, 50, 50);
        assert_relative_eq!(a.iou(&b), 2500.0 / 10000.0);
    }

    #[test]
    fn test_iou_touching_edges() {
        let a = rect(0, 0, 50, 50);
        let b = rect(50, 0, 50, 50);
        assert_relative_eq!(a.iou(&b), 0.0);
    }

    #[rstest]
    #[case::zero_width(rect(0, 0, 0, 100), rect(0, 0, 50, 50), 0.0)]
    #[case::zero_height(rect(0, 0, 100, 0), rect(0, 0, 50, 50), 0.0)]
    fn test_iou_degenerate(#[case] a: FaceRect, #[case] b: FaceRect, #[case] expected: f64) {
        assert_relative_eq!(a.iou(&b), expected);
    }

    #[test]
    fn test_area() {
        assert_eq!(rect(5, 5, 20, 10).area(), 200);
    }

    #[test]
    fn test_deduplicate_empty() {
        let result = FaceRect::deduplicate(&[], DEDUP_IOU_THRESHOLD);
        assert!(result.is_empty());
    }

    #[test]
    fn test_deduplicate_single() {
        let rects = vec![rect(0, 0, 50, 50)];
        let result = FaceRect::deduplicate(&rects, DEDUP_IOU_THRESHOLD);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_deduplicate_removes_overlapping() {
        let rects = vec![
            rect(0, 0, 100, 100),
            rect(10, 10, 100, 100), // high IoU with first
        ];
        let result = FaceRect::deduplicate(&rects, DEDUP_IOU_THRESHOLD);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0], rects[0]);
    }

    #[test]
    fn test_deduplicate_keeps_non_overlapping() {
        let rects = vec![rect(0, 0, 50, 50), rect(200, 200, 50, 50)];
        let result = FaceRect::deduplicate(&rects, DEDUP_IOU_THRESHOLD);
        assert_eq!(result.len(), 2);
    }
}
