//! Input preprocessing: letterbox resize and NCHW tensor packing.

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;

/// Metadata for mapping model-space coordinates back to the source frame
/// after a letterbox resize.
#[derive(Debug, Clone, Copy)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl Letterbox {
    /// Compute the scale and padding that fit `src_w` x `src_h` inside a
    /// square `dst` x `dst` input, preserving aspect ratio.
    pub fn fit(src_w: u32, src_h: u32, dst: u32) -> Letterbox {
        let scale_w = dst as f32 / src_w as f32;
        let scale_h = dst as f32 / src_h as f32;
        let scale = scale_w.min(scale_h);

        let new_w = (src_w as f32 * scale).round();
        let new_h = (src_h as f32 * scale).round();

        Letterbox {
            scale,
            pad_x: (dst as f32 - new_w) / 2.0,
            pad_y: (dst as f32 - new_h) / 2.0,
        }
    }

    /// Map a point from letterboxed model space back to frame space.
    pub fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Letterbox `frame` into a `size` x `size` NCHW float tensor, normalizing
/// each channel as `(p - mean) / std`. Padding areas hold the normalized
/// mean, i.e. zero when `mean` equals the pad value.
pub fn letterbox_tensor(
    frame: &RgbImage,
    size: u32,
    mean: f32,
    std: f32,
) -> (Array4<f32>, Letterbox) {
    let lb = Letterbox::fit(frame.width(), frame.height(), size);
    let new_w = (frame.width() as f32 * lb.scale).round() as u32;
    let new_h = (frame.height() as f32 * lb.scale).round() as u32;

    let resized = imageops::resize(frame, new_w.max(1), new_h.max(1), FilterType::Triangle);

    let mut tensor = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
    let x0 = lb.pad_x.floor() as u32;
    let y0 = lb.pad_y.floor() as u32;

    for (x, y, pixel) in resized.enumerate_pixels() {
        let (tx, ty) = ((x0 + x) as usize, (y0 + y) as usize);
        if tx >= size as usize || ty >= size as usize {
            continue;
        }
        for c in 0..3 {
            tensor[[0, c, ty, tx]] = (pixel.0[c] as f32 - mean) / std;
        }
    }

    (tensor, lb)
}

/// Pack an exactly `size` x `size` RGB crop into a NCHW float tensor.
pub fn image_tensor(crop: &RgbImage, size: u32, mean: f32, std: f32) -> Array4<f32> {
    let mut tensor = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
    for (x, y, pixel) in crop.enumerate_pixels() {
        if x >= size || y >= size {
            continue;
        }
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel.0[c] as f32 - mean) / std;
        }
    }
    tensor
}
