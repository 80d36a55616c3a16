use std::path::PathBuf;

/// Runtime configuration, loaded from `LOOKOUT_*` environment variables
/// with sensible defaults; CLI flags override individual fields.
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// Directory of reference images for the enrolled identity.
    pub gallery_dir: PathBuf,
    /// Where the annotated preview frame is written.
    pub preview_path: PathBuf,
    /// Cosine similarity cutoff for a positive identity match.
    pub similarity_threshold: f32,
    /// Display name of the enrolled identity.
    pub person_name: String,
    /// External speech synthesizer command; tokens after the program name
    /// become fixed arguments placed before each utterance.
    pub speaker_command: String,
    /// Optional external speech recognizer command (line-oriented stdout).
    /// Absent means the voice-command feature is disabled.
    pub listener_command: Option<String>,
}

impl Config {
    /// Load configuration from `LOOKOUT_*` environment variables.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("lookout");

        let model_dir = std::env::var("LOOKOUT_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("models"));

        let gallery_dir = std::env::var("LOOKOUT_GALLERY_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("people"));

        let preview_path = std::env::var("LOOKOUT_PREVIEW_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("preview.png"));

        Self {
            camera_device: std::env::var("LOOKOUT_CAMERA_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            model_dir,
            gallery_dir,
            preview_path,
            similarity_threshold: env_f32("LOOKOUT_SIMILARITY_THRESHOLD", 0.35),
            person_name: std::env::var("LOOKOUT_PERSON_NAME")
                .unwrap_or_else(|_| "friend".to_string()),
            speaker_command: std::env::var("LOOKOUT_SPEAKER")
                .unwrap_or_else(|_| "espeak-ng".to_string()),
            listener_command: std::env::var("LOOKOUT_LISTENER").ok(),
        }
    }

    /// Path to the face detection model.
    pub fn face_detector_model_path(&self) -> String {
        self.model_dir
            .join("det_10g.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the face embedding model.
    pub fn face_embedder_model_path(&self) -> String {
        self.model_dir
            .join("w600k_r50.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the generic object detection model.
    pub fn object_model_path(&self) -> String {
        self.model_dir
            .join("yolov8n.onnx")
            .to_string_lossy()
            .into_owned()
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
