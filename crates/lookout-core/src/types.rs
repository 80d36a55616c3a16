use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box for a detected face, in pixel coordinates
/// of the source frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    /// Clamp all corners into a `width` × `height` frame.
    pub fn clamped(&self, width: u32, height: u32) -> BoundingBox {
        let max_x = width.saturating_sub(1) as i32;
        let max_y = height.saturating_sub(1) as i32;
        BoundingBox {
            x1: self.x1.clamp(0, max_x),
            y1: self.y1.clamp(0, max_y),
            x2: self.x2.clamp(0, max_x),
            y2: self.y2.clamp(0, max_y),
        }
    }
}

/// Face identity signature: a fixed-length vector produced by the embedder.
/// Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Cosine similarity with another embedding, in [-1, 1].
    ///
    /// Defined for embeddings of equal dimensionality only; mismatched
    /// lengths yield 0.0, as does a zero-norm operand.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return 0.0;
        }

        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 {
            dot / denom
        } else {
            0.0
        }
    }
}

/// One detected face in a frame. Produced fresh per frame, never retained.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub embedding: Embedding,
}

/// Outcome of matching a query embedding against the gallery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    pub matched: bool,
    /// Cosine similarity of the best gallery entry, in [-1, 1].
    pub similarity: f32,
}

impl MatchResult {
    /// The result an empty gallery always produces.
    pub const NO_MATCH: MatchResult = MatchResult {
        matched: false,
        similarity: 0.0,
    };
}

/// Strategy for classifying a query embedding against the gallery.
pub trait Matcher {
    fn compare(&self, query: &Embedding, gallery: &[Embedding], threshold: f32) -> MatchResult;
}

/// Cosine-similarity matcher: best score over the whole gallery, matched
/// when that score reaches the threshold. The gallery holds a single
/// identity, so one global threshold suffices.
pub struct CosineMatcher;

impl Matcher for CosineMatcher {
    fn compare(&self, query: &Embedding, gallery: &[Embedding], threshold: f32) -> MatchResult {
        if gallery.is_empty() {
            return MatchResult::NO_MATCH;
        }

        let mut best = f32::NEG_INFINITY;
        for entry in gallery {
            let sim = query.similarity(entry);
            if sim > best {
                best = sim;
            }
        }

        MatchResult {
            matched: best >= threshold,
            similarity: best,
        }
    }
}
