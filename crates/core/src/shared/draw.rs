//! In-place annotation primitives for RGB frames: rectangle outlines and
//! a tiny 3x5 bitmap font for latency labels. Everything clips against the
//! frame bounds rather than panicking.

use crate::shared::face_rect::FaceRect;
use crate::shared::frame::Frame;

/// Draws a rectangle outline of the given thickness. Parts of the outline
/// outside the frame are clipped.
pub fn draw_rect(frame: &mut Frame, rect: &FaceRect, color: [u8; 3], thickness: u32) {
    let t = thickness.max(1) as i32;
    let w = rect.width as i32;
    let h = rect.height as i32;

    // Top and bottom bands
    fill(frame, rect.x, rect.y, w, t, color);
    fill(frame, rect.x, rect.y + h - t, w, t, color);
    // Left and right bands
    fill(frame, rect.x, rect.y, t, h, color);
    fill(frame, rect.x + w - t, rect.y, t, h, color);
}

/// Draws one line of text starting at `(x, y)`. Only the glyphs needed for
/// latency labels are defined; anything else renders as a filled block.
pub fn draw_text(frame: &mut Frame, x: i32, y: i32, text: &str, color: [u8; 3], scale: u32) {
    let advance = glyph_advance(scale) as i32;
    let mut cx = x;
    for c in text.chars() {
        draw_glyph(frame, cx, y, c, color, scale);
        cx += advance;
    }
}

/// Pixel width of `text` at the given scale.
pub fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * glyph_advance(scale)
}

/// Pixel height of a text line at the given scale.
pub fn text_height(scale: u32) -> u32 {
    5 * scale.max(1)
}

fn glyph_advance(scale: u32) -> u32 {
    // 3 columns plus 1 column spacing
    4 * scale.max(1)
}

fn fill(frame: &mut Frame, x: i32, y: i32, w: i32, h: i32, color: [u8; 3]) {
    let fw = frame.width() as i32;
    let fh = frame.height() as i32;
    let ch = frame.channels() as usize;
    let stride = frame.stride();
    let data = frame.data_mut();

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + w).min(fw);
    let y1 = (y + h).min(fh);

    for py in y0..y1 {
        for px in x0..x1 {
            let idx = py as usize * stride + px as usize * ch;
            data[idx..idx + 3].copy_from_slice(&color);
        }
    }
}

fn draw_glyph(frame: &mut Frame, x: i32, y: i32, c: char, color: [u8; 3], scale: u32) {
    let s = scale.max(1) as i32;
    let rows = glyph_rows(c);
    for (row, bits) in rows.iter().enumerate() {
        for col in 0..3 {
            if bits & (0x4 >> col) != 0 {
                fill(frame, x + col * s, y + row as i32 * s, s, s, color);
            }
        }
    }
}

/// 3x5 glyphs, 3 bits per row, high bit = left column.
fn glyph_rows(c: char) -> [u8; 5] {
    match c.to_ascii_uppercase() {
        '0' => [0x7, 0x5, 0x5, 0x5, 0x7],
        '1' => [0x2, 0x6, 0x2, 0x2, 0x7],
        '2' => [0x7, 0x1, 0x7, 0x4, 0x7],
        '3' => [0x7, 0x1, 0x7, 0x1, 0x7],
        '4' => [0x5, 0x5, 0x7, 0x1, 0x1],
        '5' => [0x7, 0x4, 0x7, 0x1, 0x7],
        '6' => [0x7, 0x4, 0x7, 0x5, 0x7],
        '7' => [0x7, 0x1, 0x2, 0x4, 0x4],
        '8' => [0x7, 0x5, 0x7, 0x5, 0x7],
        '9' => [0x7, 0x5, 0x7, 0x1, 0x7],
        ' ' => [0x0, 0x0, 0x0, 0x0, 0x0],
        ':' => [0x0, 0x2, 0x0, 0x2, 0x0],
        '.' => [0x0, 0x0, 0x0, 0x0, 0x2],
        'A' => [0x2, 0x5, 0x7, 0x5, 0x5],
        'C' => [0x7, 0x4, 0x4, 0x4, 0x7],
        'G' => [0x7, 0x4, 0x5, 0x5, 0x7],
        'M' => [0x5, 0x7, 0x5, 0x5, 0x5],
        'P' => [0x7, 0x5, 0x7, 0x4, 0x4],
        'S' => [0x3, 0x4, 0x2, 0x1, 0x6],
        'U' => [0x5, 0x5, 0x5, 0x5, 0x7],
        'V' => [0x5, 0x5, 0x5, 0x5, 0x2],
        _ => [0x7, 0x7, 0x7, 0x7, 0x7], // block fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 3] = [255, 0, 0];

    fn make_frame(width: u32, height: u32) -> Frame {
        Frame::new(vec![0u8; (width * height * 3) as usize], width, height, 3, 0)
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let idx = y as usize * frame.stride() + x as usize * 3;
        let d = frame.data();
        [d[idx], d[idx + 1], d[idx + 2]]
    }

    #[test]
    fn test_draw_rect_colors_border() {
        let mut frame = make_frame(40, 40);
        draw_rect(&mut frame, &FaceRect::new(10, 10, 20, 20), RED, 2);

        assert_eq!(pixel(&frame, 10, 10), RED); // top-left corner
        assert_eq!(pixel(&frame, 29, 11), RED); // right band
        assert_eq!(pixel(&frame, 15, 29), RED); // bottom band
    }

    #[test]
    fn test_draw_rect_leaves_interior_untouched() {
        let mut frame = make_frame(40, 40);
        draw_rect(&mut frame, &FaceRect::new(10, 10, 20, 20), RED, 2);
        assert_eq!(pixel(&frame, 20, 20), [0, 0, 0]);
    }

    #[test]
    fn test_draw_rect_clips_outside_frame() {
        let mut frame = make_frame(20, 20);
        // Extends beyond every edge; must not panic
        draw_rect(&mut frame, &FaceRect::new(-5, -5, 40, 40), RED, 3);
        assert_eq!(pixel(&frame, 0, 0), RED);
    }

    #[test]
    fn test_draw_text_sets_pixels() {
        let mut frame = make_frame(30, 10);
        draw_text(&mut frame, 0, 0, "1", RED, 1);
        let painted = frame.data().chunks(3).filter(|px| px == &RED).count();
        assert!(painted > 0);
    }

    #[test]
    fn test_draw_text_clips_at_edges() {
        let mut frame = make_frame(8, 8);
        draw_text(&mut frame, -2, -2, "88", RED, 2);
        draw_text(&mut frame, 6, 6, "88", RED, 2);
        // Survival is the assertion
    }

    #[test]
    fn test_text_width_scales_per_char() {
        assert_eq!(text_width("CPU", 1), 12);
        assert_eq!(text_width("CPU", 2), 24);
        assert_eq!(text_width("", 1), 0);
    }

    #[test]
    fn test_text_height() {
        assert_eq!(text_height(1), 5);
        assert_eq!(text_height(3), 15);
    }
}
