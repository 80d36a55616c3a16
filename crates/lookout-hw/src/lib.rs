//! lookout-hw — Camera capture, speech I/O and frame presentation.
//!
//! Provides V4L2-based RGB capture, an external-synthesizer speech backend,
//! an optional background transcript listener and a headless preview surface.

pub mod camera;
pub mod convert;
pub mod keys;
pub mod listener;
pub mod preview;
pub mod speech;

pub use camera::{Camera, CameraError, CameraStream, FrameSource};
pub use listener::TranscriptListener;
pub use preview::{NullPreview, PngPreview, PreviewSink};
pub use speech::SubprocessSpeaker;
