//! Collaborator contracts.
//!
//! The session engine talks to its neural and audio backends exclusively
//! through these traits. Implementations must not let internal faults escape:
//! a failing backend degrades to "nothing detected" / "nothing said", logged
//! at its own call site.

use crate::types::Detection;
use image::RgbImage;

/// Face detection plus embedding extraction.
pub trait FaceAnalyzer {
    /// Detect faces in a frame and compute an embedding for each.
    ///
    /// Returns an empty list when no face is present or when the backend
    /// faults internally.
    fn analyze(&mut self, frame: &RgbImage) -> Vec<Detection>;

    /// Fixed length of the embeddings this analyzer produces.
    fn embedding_dim(&self) -> usize;
}

/// Output of one object-detection pass.
pub struct ObjectReport {
    /// Copy of the frame with the detector's own annotations drawn on.
    pub annotated: RgbImage,
    /// Distinct class labels seen in the frame, in first-seen order.
    pub labels: Vec<String>,
}

/// Generic object detection.
pub trait ObjectDetector {
    /// Detect objects in a frame. A faulting backend returns the frame
    /// unannotated with an empty label list.
    fn detect(&mut self, frame: &RgbImage) -> ObjectReport;
}

/// Synchronous text-to-speech. Blocks until playback finishes.
pub trait SpeechOutput {
    /// Render `text` as audio. Failures are logged by the implementation,
    /// never surfaced to the caller.
    fn speak(&mut self, text: &str);
}
