//! Display surface for annotated frames.
//!
//! The session renders to a [`PreviewSink`]; the default implementation
//! writes the latest frame to a PNG path so the loop works on headless
//! machines (watch it with any auto-reloading image viewer).

use image::RgbImage;
use std::path::PathBuf;

/// Where annotated frames go once per loop iteration.
pub trait PreviewSink {
    fn present(&mut self, frame: &RgbImage);
}

/// File-backed preview: each frame overwrites the same PNG.
pub struct PngPreview {
    path: PathBuf,
    frames: u64,
}

impl PngPreview {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(dir = %parent.display(), error = %e, "could not create preview directory");
            }
        }
        Self { path, frames: 0 }
    }
}

impl PreviewSink for PngPreview {
    fn present(&mut self, frame: &RgbImage) {
        self.frames += 1;
        if let Err(e) = frame.save(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "preview write failed");
        } else {
            tracing::trace!(frame = self.frames, path = %self.path.display(), "preview updated");
        }
    }
}

/// Discards frames. Used when no preview is wanted and in tests.
pub struct NullPreview;

impl PreviewSink for NullPreview {
    fn present(&mut self, _frame: &RgbImage) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_preview_writes_file() {
        let path = std::env::temp_dir().join(format!(
            "lookout-preview-{}.png",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let mut sink = PngPreview::new(&path);
        let frame = RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3]));
        sink.present(&frame);
        sink.present(&frame);

        assert!(path.exists());
        assert_eq!(sink.frames, 2);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_unwritable_path_does_not_panic() {
        let mut sink = PngPreview::new("/proc/lookout-cannot-write/preview.png");
        let frame = RgbImage::from_pixel(4, 4, image::Rgb([0, 0, 0]));
        sink.present(&frame);
    }
}
