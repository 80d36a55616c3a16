//! Pixel-format conversion for captured buffers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("buffer too short: expected {expected} bytes, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },
}

/// Convert packed YUYV (4:2:2) to interleaved RGB888 using BT.601.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]; the chroma pair is
/// shared by both pixels.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ConvertError> {
    let pixels = (width * height) as usize;
    let expected = pixels * 2;
    if yuyv.len() < expected {
        return Err(ConvertError::BufferTooShort {
            expected,
            actual: yuyv.len(),
        });
    }

    let mut rgb = Vec::with_capacity(pixels * 3);
    for chunk in yuyv[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        push_rgb(&mut rgb, y0, u, v);
        push_rgb(&mut rgb, y1, u, v);
    }
    Ok(rgb)
}

fn push_rgb(out: &mut Vec<u8>, y: u8, u: u8, v: u8) {
    // BT.601 limited-range integer conversion.
    let c = i32::from(y) - 16;
    let d = i32::from(u) - 128;
    let e = i32::from(v) - 128;

    let r = (298 * c + 409 * e + 128) >> 8;
    let g = (298 * c - 100 * d - 208 * e + 128) >> 8;
    let b = (298 * c + 516 * d + 128) >> 8;

    out.push(r.clamp(0, 255) as u8);
    out.push(g.clamp(0, 255) as u8);
    out.push(b.clamp(0, 255) as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_to_rgb_length() {
        // 2x1 image: one YUYV quad
        let rgb = yuyv_to_rgb(&[128, 128, 128, 128], 2, 1).unwrap();
        assert_eq!(rgb.len(), 6);
    }

    #[test]
    fn test_yuyv_neutral_chroma_is_gray() {
        // Y=128, U=V=128 is mid gray; R==G==B within rounding.
        let rgb = yuyv_to_rgb(&[128, 128, 128, 128], 2, 1).unwrap();
        let (r, g, b) = (rgb[0], rgb[1], rgb[2]);
        assert!(r.abs_diff(g) <= 1 && g.abs_diff(b) <= 1, "{r} {g} {b}");
    }

    #[test]
    fn test_yuyv_white_and_black() {
        // Y=235 full white, Y=16 full black (limited range).
        let rgb = yuyv_to_rgb(&[235, 128, 16, 128], 2, 1).unwrap();
        assert!(rgb[0] >= 250 && rgb[1] >= 250 && rgb[2] >= 250);
        assert!(rgb[3] <= 5 && rgb[4] <= 5 && rgb[5] <= 5);
    }

    #[test]
    fn test_yuyv_too_short() {
        assert!(yuyv_to_rgb(&[0, 0], 2, 1).is_err());
    }

    #[test]
    fn test_yuyv_red_cast() {
        // High V pushes red above green/blue.
        let rgb = yuyv_to_rgb(&[128, 128, 128, 240], 2, 1).unwrap();
        assert!(rgb[0] > rgb[1] && rgb[0] > rgb[2]);
    }
}
