//! lookout-vision — Default neural backends for the session loop.
//!
//! `OnnxFaceAnalyzer` pairs an anchor-free face detection model with an
//! embedding model; `OnnxObjectDetector` wraps a single-tensor generic
//! object detector. Both run on CPU via ONNX Runtime and implement the
//! `lookout-core` backend traits with swallow-and-log fault handling.

pub mod analyzer;
pub mod objects;
pub mod postprocess;
pub mod prep;

pub use analyzer::{AnalyzerError, OnnxFaceAnalyzer};
pub use objects::{ObjectError, OnnxObjectDetector};
