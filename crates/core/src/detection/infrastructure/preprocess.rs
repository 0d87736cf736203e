//! Backend preprocessing: color-space reduction to a single intensity
//! plane followed by histogram equalization. Both backends must run these
//! two steps, in this order, before detection; detection accuracy depends
//! on it. The CPU backend calls the host routines directly, the GPU
//! backend runs the same math in compute shaders and shares
//! [`equalization_lut`] for the table construction.

use crate::shared::frame::Frame;

/// Integer Rec.601 luma weights, chosen to match the WGSL implementation
/// bit for bit: `(77 R + 150 G + 29 B) >> 8`.
pub const LUMA_WEIGHTS: (u32, u32, u32) = (77, 150, 29);

/// Converts an RGB frame into a grayscale plane, reusing `out`.
pub fn grayscale_into(frame: &Frame, out: &mut Vec<u8>) {
    let pixels = (frame.width() * frame.height()) as usize;
    out.clear();
    out.reserve(pixels);

    let ch = frame.channels() as usize;
    if ch == 1 {
        out.extend_from_slice(frame.data());
        return;
    }

    let (wr, wg, wb) = LUMA_WEIGHTS;
    for px in frame.data().chunks_exact(ch) {
        let v = (wr * px[0] as u32 + wg * px[1] as u32 + wb * px[2] as u32) >> 8;
        out.push(v as u8);
    }
}

pub fn histogram(gray: &[u8]) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &v in gray {
        hist[v as usize] += 1;
    }
    hist
}

/// Builds the equalization lookup table from an intensity histogram.
///
/// Standard CDF stretch: the darkest occupied bin maps to 0 and the
/// brightest to 255. A single-bin histogram (flat image) yields the
/// identity table, since there is no contrast to redistribute.
pub fn equalization_lut(hist: &[u32; 256]) -> [u8; 256] {
    let total: u64 = hist.iter().map(|&c| c as u64).sum();
    let mut lut = [0u8; 256];

    let cdf_min = hist
        .iter()
        .scan(0u64, |acc, &c| {
            *acc += c as u64;
            Some(*acc)
        })
        .find(|&c| c > 0)
        .unwrap_or(0);

    if total == 0 || cdf_min == total {
        for (i, entry) in lut.iter_mut().enumerate() {
            *entry = i as u8;
        }
        return lut;
    }

    let scale = 255.0 / (total - cdf_min) as f64;
    let mut cdf = 0u64;
    for (i, &count) in hist.iter().enumerate() {
        cdf += count as u64;
        lut[i] = if cdf <= cdf_min {
            0
        } else {
            ((cdf - cdf_min) as f64 * scale).round().min(255.0) as u8
        };
    }
    lut
}

/// Histogram-equalizes a grayscale plane in place.
pub fn equalize_in_place(gray: &mut [u8]) {
    let hist = histogram(gray);
    let lut = equalization_lut(&hist);
    for v in gray.iter_mut() {
        *v = lut[*v as usize];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grayscale_known_values() {
        // Pure red, green, blue, white pixels
        let data = vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
        let frame = Frame::new(data, 4, 1, 3, 0);
        let mut gray = Vec::new();
        grayscale_into(&frame, &mut gray);

        assert_eq!(gray[0], ((77 * 255) >> 8) as u8);
        assert_eq!(gray[1], ((150 * 255) >> 8) as u8);
        assert_eq!(gray[2], ((29 * 255) >> 8) as u8);
        assert_eq!(gray[3], (((77 + 150 + 29) * 255) >> 8) as u8);
    }

    #[test]
    fn test_grayscale_single_channel_passthrough() {
        let data = vec![10u8, 20, 30, 40];
        let frame = Frame::new(data.clone(), 2, 2, 1, 0);
        let mut gray = Vec::new();
        grayscale_into(&frame, &mut gray);
        assert_eq!(gray, data);
    }

    #[test]
    fn test_grayscale_reuses_buffer() {
        let frame = Frame::new(vec![128u8; 2 * 2 * 3], 2, 2, 3, 0);
        let mut gray = vec![0u8; 99];
        grayscale_into(&frame, &mut gray);
        assert_eq!(gray.len(), 4);
    }

    #[test]
    fn test_histogram_counts() {
        let hist = histogram(&[0, 0, 5, 255]);
        assert_eq!(hist[0], 2);
        assert_eq!(hist[5], 1);
        assert_eq!(hist[255], 1);
        assert_eq!(hist.iter().sum::<u32>(), 4);
    }

    #[test]
    fn test_equalize_flat_image_is_identity() {
        let mut gray = vec![100u8; 64];
        equalize_in_place(&mut gray);
        assert!(gray.iter().all(|&v| v == 100));
    }

    #[test]
    fn test_equalize_stretches_to_full_range() {
        // Narrow band of intensities 100..=115
        let mut gray: Vec<u8> = (0..64).map(|i| 100 + (i % 16) as u8).collect();
        equalize_in_place(&mut gray);
        assert_eq!(*gray.iter().min().unwrap(), 0);
        assert_eq!(*gray.iter().max().unwrap(), 255);
    }

    #[test]
    fn test_equalize_two_level_image_maps_to_extremes() {
        let mut gray = vec![60u8; 32];
        gray[16..].fill(200);
        equalize_in_place(&mut gray);
        assert!(gray[..16].iter().all(|&v| v == 0));
        assert!(gray[16..].iter().all(|&v| v == 255));
    }

    #[test]
    fn test_lut_is_monotonic() {
        let gray: Vec<u8> = (0..=255).cycle().take(1000).map(|v| v as u8).collect();
        let lut = equalization_lut(&histogram(&gray));
        for w in lut.windows(2) {
            assert!(w[0] <= w[1]);
        }
    }

    #[test]
    fn test_empty_histogram_identity_lut() {
        let lut = equalization_lut(&[0u32; 256]);
        assert_eq!(lut[0], 0);
        assert_eq!(lut[128], 128);
        assert_eq!(lut[255], 255);
    }
}
