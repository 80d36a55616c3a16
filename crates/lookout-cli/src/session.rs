//! The perception session loop.
//!
//! One blocking pass per captured frame: object detection, face analysis
//! on the raw frame, identity matching, overlay drawing, at-most-once
//! greetings, presence banner, preview, command poll. Speech is
//! synchronous by design, so an utterance stalls the next frame; that
//! latency trade is part of the product behavior.

use chrono::Timelike;
use lookout_core::{
    greeting_word, overlay, CosineMatcher, EmbeddingGallery, FaceAnalyzer, GreetingLedger,
    Matcher, ObjectDetector, SessionCommand, SpeechOutput, UNKNOWN_LABEL,
};
use lookout_hw::camera::FrameSource;
use lookout_hw::preview::PreviewSink;
use tokio::sync::mpsc;

/// Why the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Explicit quit command.
    Quit,
    /// Frame acquisition failed; the loop cannot continue.
    CameraFailed,
}

/// Outcome of a completed session.
#[derive(Debug)]
pub struct SessionSummary {
    pub frames: u64,
    pub stop: StopReason,
    pub greetings_issued: usize,
}

pub struct SessionConfig {
    pub threshold: f32,
    pub person_name: String,
}

/// The session engine, generic over its collaborators so tests can drive
/// it with scripted backends.
pub struct SessionLoop<C, O, A, S, P>
where
    C: FrameSource,
    O: ObjectDetector,
    A: FaceAnalyzer,
    S: SpeechOutput,
    P: PreviewSink,
{
    camera: C,
    objects: O,
    faces: A,
    speech: S,
    preview: P,
    gallery: EmbeddingGallery,
    greeted: GreetingLedger,
    commands: mpsc::Receiver<SessionCommand>,
    cfg: SessionConfig,
}

impl<C, O, A, S, P> SessionLoop<C, O, A, S, P>
where
    C: FrameSource,
    O: ObjectDetector,
    A: FaceAnalyzer,
    S: SpeechOutput,
    P: PreviewSink,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        camera: C,
        objects: O,
        faces: A,
        speech: S,
        preview: P,
        gallery: EmbeddingGallery,
        commands: mpsc::Receiver<SessionCommand>,
        cfg: SessionConfig,
    ) -> Self {
        Self {
            camera,
            objects,
            faces,
            speech,
            preview,
            gallery,
            greeted: GreetingLedger::new(),
            commands,
            cfg,
        }
    }

    /// Run until a quit command or a camera failure.
    pub fn run(&mut self) -> SessionSummary {
        self.gallery.reload(&mut self.faces);
        tracing::info!(
            person = %self.cfg.person_name,
            threshold = self.cfg.threshold,
            gallery = self.gallery.len(),
            "session started; send 's' to enroll, 'q' to quit"
        );

        let mut frames = 0u64;
        let stop = loop {
            let frame = match self.camera.next_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(error = %e, "frame acquisition failed, ending session");
                    break StopReason::CameraFailed;
                }
            };

            self.process_frame(&frame);
            frames += 1;

            let mut quit = false;
            while let Ok(cmd) = self.commands.try_recv() {
                match cmd {
                    SessionCommand::Enroll => self.enroll_current(&frame),
                    SessionCommand::Quit => quit = true,
                }
            }
            if quit {
                tracing::info!("quit requested");
                break StopReason::Quit;
            }
        };

        SessionSummary {
            frames,
            stop,
            greetings_issued: self.greeted.len(),
        }
    }

    /// Steps 2-7 of the per-frame algorithm. Detectors run on the raw
    /// frame; all drawing lands on the object detector's annotated copy.
    fn process_frame(&mut self, frame: &image::RgbImage) {
        let report = self.objects.detect(frame);
        let mut annotated = report.annotated;

        let detections = self.faces.analyze(frame);
        let hour = chrono::Local::now().hour();

        for detection in &detections {
            let result = CosineMatcher.compare(
                &detection.embedding,
                self.gallery.entries(),
                self.cfg.threshold,
            );
            let (label, color) = if result.matched {
                (self.cfg.person_name.as_str(), overlay::GREEN)
            } else {
                (UNKNOWN_LABEL, overlay::RED)
            };
            tracing::trace!(label, similarity = result.similarity, "face classified");

            overlay::draw_box(&mut annotated, &detection.bbox, color, 2);
            overlay::draw_label(
                &mut annotated,
                detection.bbox.x1,
                detection.bbox.y1 - overlay::label_height() as i32 - 4,
                label,
                color,
            );

            // One greeting per distinct label per session, not per face.
            if self.greeted.should_greet(label) {
                let line = greeting_line(result.matched, &self.cfg.person_name, hour);
                self.speech.speak(&line);
                self.greeted.record(label);
            }
        }

        let (banner, color) = presence_banner(&report.labels, hour);
        overlay::draw_banner(&mut annotated, &banner, color);

        self.preview.present(&annotated);
    }

    /// Enrollment workflow: embed and persist the raw current frame, then
    /// rebuild the gallery from disk so memory and files cannot drift.
    /// The confirmation is spoken whether or not a face was found; the
    /// actual outcome goes to the log.
    fn enroll_current(&mut self, frame: &image::RgbImage) {
        if self.gallery.enroll(frame, &mut self.faces, true) {
            self.gallery.reload(&mut self.faces);
            tracing::info!(gallery = self.gallery.len(), "enrolled current frame");
        } else {
            tracing::warn!("no face in captured frame, nothing enrolled");
        }
        self.speech.speak("Image saved for training.");
    }
}

/// Spoken greeting for a classified face.
fn greeting_line(matched: bool, person_name: &str, hour: u32) -> String {
    if matched {
        format!("{} {}! Good to see you!", greeting_word(hour), person_name)
    } else {
        "Hello, I don't believe we've met. Could you introduce yourself?".to_string()
    }
}

/// Per-frame presence line derived from the object labels. Fires every
/// frame; unlike greetings it is not de-duplicated.
fn presence_banner(labels: &[String], hour: u32) -> (String, overlay::Color) {
    if labels.iter().any(|l| l == "person") {
        (
            format!("{}, someone is here", greeting_word(hour)),
            overlay::GREEN,
        )
    } else {
        ("I don't see anyone...".to_string(), overlay::RED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use lookout_core::{BoundingBox, Detection, Embedding, ObjectReport};
    use lookout_hw::camera::CameraError;
    use lookout_hw::preview::NullPreview;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    struct StubCamera {
        frames: VecDeque<RgbImage>,
    }

    impl StubCamera {
        fn with_frames(count: usize) -> Self {
            let frame = RgbImage::from_pixel(64, 48, image::Rgb([10, 20, 30]));
            Self {
                frames: std::iter::repeat(frame).take(count).collect(),
            }
        }
    }

    impl FrameSource for StubCamera {
        fn next_frame(&mut self) -> Result<RgbImage, CameraError> {
            self.frames
                .pop_front()
                .ok_or_else(|| CameraError::CaptureFailed("no more frames".to_string()))
        }
    }

    struct StubObjects {
        labels: Vec<String>,
    }

    impl ObjectDetector for StubObjects {
        fn detect(&mut self, frame: &RgbImage) -> ObjectReport {
            ObjectReport {
                annotated: frame.clone(),
                labels: self.labels.clone(),
            }
        }
    }

    /// Reports the same faces for every frame (and every gallery image).
    struct StubFaces {
        detections: Vec<Detection>,
    }

    impl StubFaces {
        fn faces(embeddings: &[&[f32]]) -> Self {
            let detections = embeddings
                .iter()
                .map(|values| Detection {
                    bbox: BoundingBox { x1: 5, y1: 5, x2: 25, y2: 25 },
                    embedding: Embedding::new(values.to_vec()),
                })
                .collect();
            Self { detections }
        }

        fn none() -> Self {
            Self { detections: vec![] }
        }
    }

    impl FaceAnalyzer for StubFaces {
        fn analyze(&mut self, _frame: &RgbImage) -> Vec<Detection> {
            self.detections.clone()
        }

        fn embedding_dim(&self) -> usize {
            2
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSpeaker {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl SpeechOutput for RecordingSpeaker {
        fn speak(&mut self, text: &str) {
            self.lines.lock().unwrap().push(text.to_string());
        }
    }

    fn scratch_dir(tag: &str) -> PathBuf {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "lookout-session-{tag}-{}-{n}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cfg() -> SessionConfig {
        SessionConfig {
            threshold: 0.35,
            person_name: "Ada".to_string(),
        }
    }

    fn channel() -> (mpsc::Sender<SessionCommand>, mpsc::Receiver<SessionCommand>) {
        mpsc::channel(8)
    }

    /// Mirrors the live wiring, where the capture stream borrows the open
    /// camera device for the whole session.
    struct FrameWell {
        frames: RefCell<VecDeque<RgbImage>>,
    }

    struct BorrowedStream<'a> {
        well: &'a FrameWell,
    }

    impl FrameSource for BorrowedStream<'_> {
        fn next_frame(&mut self) -> Result<RgbImage, CameraError> {
            self.well
                .frames
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| CameraError::CaptureFailed("drained".to_string()))
        }
    }

    #[test]
    fn test_device_scoped_frame_source_drives_session() {
        let dir = scratch_dir("borrowed");
        let well = FrameWell {
            frames: RefCell::new(
                std::iter::repeat(RgbImage::from_pixel(32, 24, image::Rgb([0, 0, 0])))
                    .take(2)
                    .collect(),
            ),
        };
        let (_tx, rx) = channel();

        let mut session = SessionLoop::new(
            BorrowedStream { well: &well },
            StubObjects { labels: vec![] },
            StubFaces::none(),
            RecordingSpeaker::default(),
            NullPreview,
            EmbeddingGallery::new(&dir),
            rx,
            cfg(),
        );

        let summary = session.run();
        assert_eq!(summary.stop, StopReason::CameraFailed);
        assert_eq!(summary.frames, 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_two_unknown_faces_greeted_once() {
        let dir = scratch_dir("unknowns");
        let speaker = RecordingSpeaker::default();
        let (_tx, rx) = channel();

        let mut session = SessionLoop::new(
            StubCamera::with_frames(2),
            StubObjects { labels: vec!["person".to_string()] },
            StubFaces::faces(&[&[0.0, 1.0], &[0.1, 0.9]]),
            speaker.clone(),
            NullPreview,
            EmbeddingGallery::new(&dir),
            rx,
            cfg(),
        );

        let summary = session.run();
        assert_eq!(summary.stop, StopReason::CameraFailed);
        assert_eq!(summary.frames, 2);

        // Two simultaneous strangers share one label: one greeting total,
        // across both faces and both frames.
        let lines = speaker.lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("introduce"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_known_face_greeted_once_by_name() {
        let dir = scratch_dir("known");
        // Seed one reference image; the stub analyzer gives it the same
        // embedding as the live face, so reload yields a matching gallery.
        RgbImage::from_pixel(16, 16, image::Rgb([1, 1, 1]))
            .save(dir.join("ref.png"))
            .unwrap();

        let speaker = RecordingSpeaker::default();
        let (_tx, rx) = channel();

        let mut session = SessionLoop::new(
            StubCamera::with_frames(3),
            StubObjects { labels: vec![] },
            StubFaces::faces(&[&[1.0, 0.0]]),
            speaker.clone(),
            NullPreview,
            EmbeddingGallery::new(&dir),
            rx,
            cfg(),
        );

        let summary = session.run();
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.greetings_issued, 1);

        let lines = speaker.lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Ada"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_quit_command_ends_session() {
        let dir = scratch_dir("quit");
        let speaker = RecordingSpeaker::default();
        let (tx, rx) = channel();
        tx.try_send(SessionCommand::Quit).unwrap();

        let mut session = SessionLoop::new(
            StubCamera::with_frames(100),
            StubObjects { labels: vec![] },
            StubFaces::none(),
            speaker,
            NullPreview,
            EmbeddingGallery::new(&dir),
            rx,
            cfg(),
        );

        let summary = session.run();
        assert_eq!(summary.stop, StopReason::Quit);
        assert_eq!(summary.frames, 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_enroll_command_grows_gallery_and_confirms() {
        let dir = scratch_dir("enroll");
        let speaker = RecordingSpeaker::default();
        let (tx, rx) = channel();
        tx.try_send(SessionCommand::Enroll).unwrap();
        tx.try_send(SessionCommand::Quit).unwrap();

        let mut session = SessionLoop::new(
            StubCamera::with_frames(2),
            StubObjects { labels: vec![] },
            StubFaces::faces(&[&[0.5, 0.5]]),
            speaker.clone(),
            NullPreview,
            EmbeddingGallery::new(&dir),
            rx,
            cfg(),
        );

        let summary = session.run();
        assert_eq!(summary.stop, StopReason::Quit);

        // One reference image persisted, and the post-enroll reload saw it.
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 1);
        assert_eq!(session.gallery.len(), 1);

        let lines = speaker.lines.lock().unwrap();
        assert!(lines.iter().any(|l| l.contains("saved for training")));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_enroll_without_face_still_confirms() {
        let dir = scratch_dir("enroll-noface");
        let speaker = RecordingSpeaker::default();
        let (tx, rx) = channel();
        tx.try_send(SessionCommand::Enroll).unwrap();
        tx.try_send(SessionCommand::Quit).unwrap();

        let mut session = SessionLoop::new(
            StubCamera::with_frames(1),
            StubObjects { labels: vec![] },
            StubFaces::none(),
            speaker.clone(),
            NullPreview,
            EmbeddingGallery::new(&dir),
            rx,
            cfg(),
        );

        session.run();
        assert_eq!(session.gallery.len(), 0);
        // The confirmation fires regardless of the enrollment outcome.
        let lines = speaker.lines.lock().unwrap();
        assert!(lines.iter().any(|l| l.contains("saved for training")));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_greeting_line_phrasing() {
        let known = greeting_line(true, "Ada", 9);
        assert_eq!(known, "Good morning Ada! Good to see you!");

        let unknown = greeting_line(false, "Ada", 9);
        assert!(!unknown.contains("Ada"));
        assert!(unknown.contains("introduce"));
    }

    #[test]
    fn test_presence_banner() {
        let labels = vec!["chair".to_string(), "person".to_string()];
        let (text, color) = presence_banner(&labels, 13);
        assert_eq!(text, "Good afternoon, someone is here");
        assert_eq!(color, overlay::GREEN);

        let (text, color) = presence_banner(&[], 13);
        assert_eq!(text, "I don't see anyone...");
        assert_eq!(color, overlay::RED);
    }
}
