mod config;
mod session;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use lookout_core::{EmbeddingGallery, FaceAnalyzer, SessionCommand};
use lookout_hw::{Camera, PngPreview, SubprocessSpeaker, TranscriptListener};
use lookout_vision::{OnnxFaceAnalyzer, OnnxObjectDetector};
use session::{SessionConfig, SessionLoop};
use std::path::PathBuf;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "lookout", about = "Lookout visual companion")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive companion session
    Run {
        /// Camera device path (overrides LOOKOUT_CAMERA_DEVICE)
        #[arg(short, long)]
        device: Option<String>,
        /// Similarity threshold for a positive match
        #[arg(short, long)]
        threshold: Option<f32>,
        /// Name of the enrolled person
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Enroll a reference image from a file instead of the live camera
    Enroll {
        /// Image containing exactly the face to enroll
        #[arg(short, long)]
        image: PathBuf,
    },
    /// Inspect the reference gallery
    Gallery {
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// List available capture devices
    Devices,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = Config::from_env();

    match cli.command {
        Commands::Run {
            device,
            threshold,
            name,
        } => run_session(cfg, device, threshold, name),
        Commands::Enroll { image } => enroll_from_file(cfg, &image),
        Commands::Gallery { json } => inspect_gallery(cfg, json),
        Commands::Devices => {
            for dev in Camera::list_devices() {
                println!("{dev}");
            }
            Ok(())
        }
    }
}

fn run_session(
    cfg: Config,
    device: Option<String>,
    threshold: Option<f32>,
    name: Option<String>,
) -> Result<()> {
    let device = device.unwrap_or(cfg.camera_device.clone());
    let camera = Camera::open(&device)
        .with_context(|| format!("failed to open camera {device}"))?;

    let faces = OnnxFaceAnalyzer::load(
        &cfg.face_detector_model_path(),
        &cfg.face_embedder_model_path(),
    )
    .context("failed to load face models")?;
    let objects = OnnxObjectDetector::load(&cfg.object_model_path())
        .context("failed to load object detection model")?;

    let gallery = EmbeddingGallery::new(&cfg.gallery_dir);
    let mut speaker_tokens = cfg.speaker_command.split_whitespace();
    let speaker = SubprocessSpeaker::new(speaker_tokens.next().unwrap_or("espeak-ng"))
        .with_args(speaker_tokens.map(str::to_string).collect());
    let preview = PngPreview::new(&cfg.preview_path);

    let (tx, rx) = mpsc::channel::<SessionCommand>(8);
    lookout_hw::keys::spawn_key_reader(tx.clone());

    // Spoken commands go through the same channel as typed ones, so the
    // session loop never knows which input produced a command.
    let listener = cfg.listener_command.as_deref().and_then(|command| {
        let voice_tx = tx.clone();
        match TranscriptListener::spawn(command, move |transcript| {
            match SessionCommand::parse(&transcript) {
                Some(cmd) => {
                    let _ = voice_tx.blocking_send(cmd);
                }
                None => tracing::debug!(%transcript, "ignoring transcript"),
            }
        }) {
            Ok(listener) => Some(listener),
            Err(e) => {
                tracing::warn!(error = %e, command, "speech recognition disabled");
                None
            }
        }
    });

    let stream = camera
        .start_stream()
        .context("failed to start capture stream")?;

    let mut session = SessionLoop::new(
        stream,
        objects,
        faces,
        speaker,
        preview,
        gallery,
        rx,
        SessionConfig {
            threshold: threshold.unwrap_or(cfg.similarity_threshold),
            person_name: name.unwrap_or(cfg.person_name.clone()),
        },
    );

    let summary = session.run();

    if let Some(listener) = listener {
        listener.stop();
    }

    tracing::info!(
        frames = summary.frames,
        greetings = summary.greetings_issued,
        stop = ?summary.stop,
        "session ended"
    );
    match summary.stop {
        session::StopReason::Quit => Ok(()),
        session::StopReason::CameraFailed => bail!("camera failure ended the session"),
    }
}

fn enroll_from_file(cfg: Config, image_path: &std::path::Path) -> Result<()> {
    let mut faces = OnnxFaceAnalyzer::load(
        &cfg.face_detector_model_path(),
        &cfg.face_embedder_model_path(),
    )
    .context("failed to load face models")?;

    let frame = image::open(image_path)
        .with_context(|| format!("failed to read {}", image_path.display()))?
        .to_rgb8();

    let mut gallery = EmbeddingGallery::new(&cfg.gallery_dir);
    gallery.reload(&mut faces);
    if !gallery.enroll(&frame, &mut faces, true) {
        bail!("no face found in {}", image_path.display());
    }

    println!(
        "enrolled {} into {}",
        image_path.display(),
        cfg.gallery_dir.display()
    );
    Ok(())
}

fn inspect_gallery(cfg: Config, json: bool) -> Result<()> {
    let mut faces = OnnxFaceAnalyzer::load(
        &cfg.face_detector_model_path(),
        &cfg.face_embedder_model_path(),
    )
    .context("failed to load face models")?;

    let mut gallery = EmbeddingGallery::new(&cfg.gallery_dir);
    gallery.reload(&mut faces);

    if json {
        let report = serde_json::json!({
            "dir": cfg.gallery_dir,
            "entries": gallery.len(),
            "embedding_dim": faces.embedding_dim(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} reference embeddings in {}",
            gallery.len(),
            cfg.gallery_dir.display()
        );
    }
    Ok(())
}
