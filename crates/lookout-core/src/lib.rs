//! lookout-core — Identity matching and session-state engine.
//!
//! Owns the embedding gallery, the cosine-similarity matcher, the greeting
//! policy and the collaborator contracts (face analysis, object detection,
//! speech output). Detector backends live in `lookout-vision`; camera, speech
//! and display plumbing live in `lookout-hw`.

pub mod backend;
pub mod command;
pub mod gallery;
pub mod greeting;
pub mod overlay;
pub mod types;

pub use backend::{FaceAnalyzer, ObjectDetector, ObjectReport, SpeechOutput};
pub use command::SessionCommand;
pub use gallery::EmbeddingGallery;
pub use greeting::{greeting_word, GreetingLedger, UNKNOWN_LABEL};
pub use types::{BoundingBox, CosineMatcher, Detection, Embedding, MatchResult, Matcher};
