//! Embedding gallery: the known-identity reference set.
//!
//! All embeddings belong to a single enrolled identity. The gallery is
//! rebuilt wholesale from the backing image directory on every reload —
//! the images are the persistence format, the vectors are derived state.

use crate::backend::FaceAnalyzer;
use crate::types::Embedding;
use image::RgbImage;
use std::path::{Path, PathBuf};

/// Raster formats accepted when scanning the reference directory.
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// In-memory collection of the enrolled identity's embeddings, backed by a
/// directory of reference images.
pub struct EmbeddingGallery {
    dir: PathBuf,
    embeddings: Vec<Embedding>,
}

impl EmbeddingGallery {
    /// Create an empty gallery over `dir`, creating the directory if needed.
    /// No scan happens here; call [`reload`](Self::reload) to populate.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "could not create gallery directory");
        }
        Self {
            dir,
            embeddings: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entries(&self) -> &[Embedding] {
        &self.embeddings
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Rebuild the gallery from the reference-image directory.
    ///
    /// Each readable image contributes its first detected face's embedding.
    /// Unreadable files, faceless images and wrong-dimension embeddings are
    /// skipped with a log line; one bad file never aborts the scan. The old
    /// collection is replaced in a single assignment at the end, so readers
    /// never observe a half-built gallery.
    pub fn reload(&mut self, analyzer: &mut dyn FaceAnalyzer) {
        let mut fresh = Vec::new();

        match std::fs::read_dir(&self.dir) {
            Ok(entries) => {
                let mut paths: Vec<PathBuf> = entries
                    .filter_map(|e| e.ok().map(|e| e.path()))
                    .filter(|p| has_image_extension(p))
                    .collect();
                paths.sort();

                for path in paths {
                    match image::open(&path) {
                        Ok(img) => {
                            if let Some(emb) = self.first_face(&img.to_rgb8(), analyzer, &path) {
                                fresh.push(emb);
                            }
                        }
                        Err(e) => {
                            tracing::debug!(path = %path.display(), error = %e, "skipping unreadable image");
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "gallery directory not readable");
            }
        }

        self.embeddings = fresh;
        tracing::info!(
            count = self.embeddings.len(),
            dir = %self.dir.display(),
            "gallery reloaded"
        );
    }

    /// Embed one in-memory frame and append it to the gallery.
    ///
    /// Returns false (and mutates nothing) when no face is found. With
    /// `persist`, the frame is also written to the reference directory under
    /// a timestamp-derived name; a write failure is logged but does not undo
    /// the in-memory append.
    pub fn enroll(
        &mut self,
        frame: &RgbImage,
        analyzer: &mut dyn FaceAnalyzer,
        persist: bool,
    ) -> bool {
        let detections = analyzer.analyze(frame);
        let Some(first) = detections.into_iter().next() else {
            tracing::debug!("enroll: no face found in frame");
            return false;
        };

        let dim = analyzer.embedding_dim();
        if dim != 0 && first.embedding.len() != dim {
            tracing::warn!(
                got = first.embedding.len(),
                expected = dim,
                "enroll: embedding dimension mismatch, rejected"
            );
            return false;
        }

        self.embeddings.push(first.embedding);

        if persist {
            let path = self.capture_path();
            match frame.save(&path) {
                Ok(()) => tracing::info!(path = %path.display(), "enroll: reference image saved"),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "enroll: could not save reference image")
                }
            }
        }

        true
    }

    /// First face of a reference image, dimension-checked.
    fn first_face(
        &self,
        img: &RgbImage,
        analyzer: &mut dyn FaceAnalyzer,
        path: &Path,
    ) -> Option<Embedding> {
        let detections = analyzer.analyze(img);
        let first = detections.into_iter().next().or_else(|| {
            tracing::debug!(path = %path.display(), "skipping image with no detectable face");
            None
        })?;

        let dim = analyzer.embedding_dim();
        if dim != 0 && first.embedding.len() != dim {
            tracing::warn!(
                path = %path.display(),
                got = first.embedding.len(),
                expected = dim,
                "skipping embedding with wrong dimension"
            );
            return None;
        }
        Some(first.embedding)
    }

    /// Timestamp-derived capture path. Second-granularity names can repeat
    /// under rapid triggers, so an existing name gets a counter suffix
    /// instead of being overwritten.
    fn capture_path(&self) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut path = self.dir.join(format!("{stamp}.jpg"));
        let mut n = 1u32;
        while path.exists() {
            path = self.dir.join(format!("{stamp}_{n}.jpg"));
            n += 1;
        }
        path
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, Detection};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Deterministic analyzer: reports one face per frame with a fixed
    /// embedding, or none at all when configured faceless.
    struct StubAnalyzer {
        embedding: Vec<f32>,
        faceless: bool,
    }

    impl StubAnalyzer {
        fn with_embedding(embedding: Vec<f32>) -> Self {
            Self {
                embedding,
                faceless: false,
            }
        }

        fn faceless() -> Self {
            Self {
                embedding: vec![],
                faceless: true,
            }
        }
    }

    impl FaceAnalyzer for StubAnalyzer {
        fn analyze(&mut self, _frame: &RgbImage) -> Vec<Detection> {
            if self.faceless {
                return vec![];
            }
            vec![Detection {
                bbox: BoundingBox { x1: 0, y1: 0, x2: 10, y2: 10 },
                embedding: Embedding::new(self.embedding.clone()),
            }]
        }

        fn embedding_dim(&self) -> usize {
            self.embedding.len()
        }
    }

    fn scratch_dir(tag: &str) -> PathBuf {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "lookout-gallery-{tag}-{}-{n}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn frame() -> RgbImage {
        RgbImage::from_pixel(32, 32, image::Rgb([90, 120, 150]))
    }

    #[test]
    fn test_reload_missing_dir_yields_empty() {
        let dir = scratch_dir("missing");
        std::fs::remove_dir_all(&dir).unwrap();
        let mut gallery = EmbeddingGallery {
            dir: dir.clone(),
            embeddings: vec![Embedding::new(vec![1.0])],
        };
        gallery.reload(&mut StubAnalyzer::with_embedding(vec![1.0, 0.0]));
        assert!(gallery.is_empty());
    }

    #[test]
    fn test_reload_skips_unreadable_and_faceless() {
        let dir = scratch_dir("skips");
        std::fs::write(dir.join("junk.jpg"), b"not an image").unwrap();
        std::fs::write(dir.join("notes.txt"), b"ignored extension").unwrap();
        frame().save(dir.join("face.png")).unwrap();

        let mut gallery = EmbeddingGallery::new(&dir);
        gallery.reload(&mut StubAnalyzer::with_embedding(vec![0.1, 0.2]));
        assert_eq!(gallery.len(), 1);

        gallery.reload(&mut StubAnalyzer::faceless());
        assert!(gallery.is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_enroll_no_face_mutates_nothing() {
        let dir = scratch_dir("noface");
        let mut gallery = EmbeddingGallery::new(&dir);
        let ok = gallery.enroll(&frame(), &mut StubAnalyzer::faceless(), true);
        assert!(!ok);
        assert!(gallery.is_empty());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_enroll_roundtrip_matches_reload() {
        let dir = scratch_dir("roundtrip");
        let mut analyzer = StubAnalyzer::with_embedding(vec![0.3, 0.4, 0.5]);
        let mut gallery = EmbeddingGallery::new(&dir);

        assert!(gallery.enroll(&frame(), &mut analyzer, true));
        let in_memory = gallery.len();

        gallery.reload(&mut analyzer);
        assert_eq!(gallery.len(), in_memory);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_enroll_without_persist_writes_nothing() {
        let dir = scratch_dir("nopersist");
        let mut analyzer = StubAnalyzer::with_embedding(vec![1.0]);
        let mut gallery = EmbeddingGallery::new(&dir);

        assert!(gallery.enroll(&frame(), &mut analyzer, false));
        assert_eq!(gallery.len(), 1);
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_rapid_enrolls_do_not_overwrite() {
        let dir = scratch_dir("rapid");
        let mut analyzer = StubAnalyzer::with_embedding(vec![1.0]);
        let mut gallery = EmbeddingGallery::new(&dir);

        // Same wall-clock second: names must still be distinct.
        assert!(gallery.enroll(&frame(), &mut analyzer, true));
        assert!(gallery.enroll(&frame(), &mut analyzer, true));
        assert!(gallery.enroll(&frame(), &mut analyzer, true));
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 3);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_has_image_extension_case_insensitive() {
        assert!(has_image_extension(Path::new("a/b/Face.JPG")));
        assert!(has_image_extension(Path::new("x.jpeg")));
        assert!(has_image_extension(Path::new("x.PNG")));
        assert!(!has_image_extension(Path::new("x.gif")));
        assert!(!has_image_extension(Path::new("noext")));
    }
}
