//! Frame annotation: box outlines, bitmap-font labels, banner line.
//!
//! Pure pixel loops over `RgbImage`; all writes are bounds-clamped so a box
//! partially outside the frame draws its visible part and nothing else.

use crate::types::BoundingBox;
use image::{Rgb, RgbImage};

pub type Color = [u8; 3];

pub const GREEN: Color = [0, 220, 80];
pub const RED: Color = [230, 60, 50];

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
/// Pixels per font pixel when rendering.
const TEXT_SCALE: u32 = 2;
/// Horizontal gap between glyphs, in font pixels.
const GLYPH_GAP: u32 = 1;

/// Draw the outline of `bbox` with the given stroke thickness.
pub fn draw_box(img: &mut RgbImage, bbox: &BoundingBox, color: Color, thickness: u32) {
    let b = bbox.clamped(img.width(), img.height());
    let t = thickness.max(1) as i32;

    for i in 0..t {
        // top and bottom edges
        for x in b.x1..=b.x2 {
            put_pixel(img, x, b.y1 + i, color);
            put_pixel(img, x, b.y2 - i, color);
        }
        // left and right edges
        for y in b.y1..=b.y2 {
            put_pixel(img, b.x1 + i, y, color);
            put_pixel(img, b.x2 - i, y, color);
        }
    }
}

/// Draw `text` with its top-left corner at (x, y).
///
/// Renders a 5x7 bitmap font at 2x scale. Lowercase maps to uppercase;
/// characters outside the font render as '?'.
pub fn draw_label(img: &mut RgbImage, x: i32, y: i32, text: &str, color: Color) {
    let advance = ((GLYPH_WIDTH + GLYPH_GAP) * TEXT_SCALE) as i32;
    let mut cursor_x = x;

    for ch in text.chars() {
        let columns = glyph(ch);
        for (col, bits) in columns.iter().enumerate() {
            for row in 0..GLYPH_HEIGHT {
                if bits & (1 << row) == 0 {
                    continue;
                }
                for sx in 0..TEXT_SCALE {
                    for sy in 0..TEXT_SCALE {
                        put_pixel(
                            img,
                            cursor_x + (col as u32 * TEXT_SCALE + sx) as i32,
                            y + (row * TEXT_SCALE + sy) as i32,
                            color,
                        );
                    }
                }
            }
        }
        cursor_x += advance;
    }
}

/// Pixel width of `text` as rendered by [`draw_label`].
pub fn label_width(text: &str) -> u32 {
    text.chars().count() as u32 * (GLYPH_WIDTH + GLYPH_GAP) * TEXT_SCALE
}

/// Pixel height of one rendered text line.
pub fn label_height() -> u32 {
    GLYPH_HEIGHT * TEXT_SCALE
}

const BANNER_X: i32 = 10;
const BANNER_Y: i32 = 40;
const BANNER_PAD: i32 = 4;
const BANNER_BACKING: Color = [20, 20, 20];

/// Draw the per-frame status line near the top-left of the frame, over a
/// dark backing strip sized to the text so it stays readable on busy frames.
pub fn draw_banner(img: &mut RgbImage, text: &str, color: Color) {
    let w = label_width(text) as i32;
    let h = label_height() as i32;
    for y in (BANNER_Y - BANNER_PAD)..(BANNER_Y + h + BANNER_PAD) {
        for x in (BANNER_X - BANNER_PAD)..(BANNER_X + w + BANNER_PAD) {
            put_pixel(img, x, y, BANNER_BACKING);
        }
    }
    draw_label(img, BANNER_X, BANNER_Y, text, color);
}

fn put_pixel(img: &mut RgbImage, x: i32, y: i32, color: Color) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x < img.width() && y < img.height() {
        img.put_pixel(x, y, Rgb(color));
    }
}

/// 5x7 font, column-major, bit 0 = top row.
fn glyph(ch: char) -> [u8; 5] {
    match ch.to_ascii_uppercase() {
        ' ' => [0x00, 0x00, 0x00, 0x00, 0x00],
        '!' => [0x00, 0x00, 0x5F, 0x00, 0x00],
        '\'' => [0x00, 0x05, 0x03, 0x00, 0x00],
        ',' => [0x00, 0x50, 0x30, 0x00, 0x00],
        '-' => [0x08, 0x08, 0x08, 0x08, 0x08],
        '.' => [0x00, 0x60, 0x60, 0x00, 0x00],
        '0' => [0x3E, 0x51, 0x49, 0x45, 0x3E],
        '1' => [0x00, 0x42, 0x7F, 0x40, 0x00],
        '2' => [0x42, 0x61, 0x51, 0x49, 0x46],
        '3' => [0x21, 0x41, 0x45, 0x4B, 0x31],
        '4' => [0x18, 0x14, 0x12, 0x7F, 0x10],
        '5' => [0x27, 0x45, 0x45, 0x45, 0x39],
        '6' => [0x3C, 0x4A, 0x49, 0x49, 0x30],
        '7' => [0x01, 0x71, 0x09, 0x05, 0x03],
        '8' => [0x36, 0x49, 0x49, 0x49, 0x36],
        '9' => [0x06, 0x49, 0x49, 0x29, 0x1E],
        'A' => [0x7E, 0x11, 0x11, 0x11, 0x7E],
        'B' => [0x7F, 0x49, 0x49, 0x49, 0x36],
        'C' => [0x3E, 0x41, 0x41, 0x41, 0x22],
        'D' => [0x7F, 0x41, 0x41, 0x22, 0x1C],
        'E' => [0x7F, 0x49, 0x49, 0x49, 0x41],
        'F' => [0x7F, 0x09, 0x09, 0x09, 0x01],
        'G' => [0x3E, 0x41, 0x49, 0x49, 0x7A],
        'H' => [0x7F, 0x08, 0x08, 0x08, 0x7F],
        'I' => [0x00, 0x41, 0x7F, 0x41, 0x00],
        'J' => [0x20, 0x40, 0x41, 0x3F, 0x01],
        'K' => [0x7F, 0x08, 0x14, 0x22, 0x41],
        'L' => [0x7F, 0x40, 0x40, 0x40, 0x40],
        'M' => [0x7F, 0x02, 0x0C, 0x02, 0x7F],
        'N' => [0x7F, 0x04, 0x08, 0x10, 0x7F],
        'O' => [0x3E, 0x41, 0x41, 0x41, 0x3E],
        'P' => [0x7F, 0x09, 0x09, 0x09, 0x06],
        'Q' => [0x3E, 0x41, 0x51, 0x21, 0x5E],
        'R' => [0x7F, 0x09, 0x19, 0x29, 0x46],
        'S' => [0x46, 0x49, 0x49, 0x49, 0x31],
        'T' => [0x01, 0x01, 0x7F, 0x01, 0x01],
        'U' => [0x3F, 0x40, 0x40, 0x40, 0x3F],
        'V' => [0x1F, 0x20, 0x40, 0x20, 0x1F],
        'W' => [0x3F, 0x40, 0x38, 0x40, 0x3F],
        'X' => [0x63, 0x14, 0x08, 0x14, 0x63],
        'Y' => [0x07, 0x08, 0x70, 0x08, 0x07],
        'Z' => [0x61, 0x51, 0x49, 0x45, 0x43],
        _ => [0x02, 0x01, 0x51, 0x09, 0x06], // '?'
    }
}
