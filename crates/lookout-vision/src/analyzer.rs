//! Combined face detection + embedding backend via ONNX Runtime.
//!
//! Detection uses an anchor-free three-stride model (SCRFD family) decoded
//! without landmarks; embeddings come from an ArcFace-family model fed a
//! margin-expanded crop of each detected box, resized to 112x112.

use crate::postprocess::{nms, to_bbox, Candidate};
use crate::prep::{image_tensor, letterbox_tensor, Letterbox};
use image::imageops::{self, FilterType};
use image::RgbImage;
use lookout_core::{Detection, Embedding, FaceAnalyzer};
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const DET_INPUT_SIZE: usize = 640;
const DET_MEAN: f32 = 127.5;
const DET_STD: f32 = 128.0;
const DET_CONFIDENCE_THRESHOLD: f32 = 0.5;
const DET_NMS_THRESHOLD: f32 = 0.4;
const DET_STRIDES: [usize; 3] = [8, 16, 32];
const DET_ANCHORS_PER_CELL: usize = 2;

const EMB_INPUT_SIZE: usize = 112;
const EMB_MEAN: f32 = 127.5;
const EMB_STD: f32 = 127.5;
const EMB_DIM: usize = 512;
/// Fractional margin added on every side of a detection before cropping
/// for the embedding model.
const CROP_MARGIN: f32 = 0.12;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("model file not found: {0} — place the ONNX models in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Output tensor indices for one detection stride: (score_idx, bbox_idx).
type StrideOutputs = (usize, usize);

/// ONNX-backed face analyzer: detector + embedder behind one handle.
pub struct OnnxFaceAnalyzer {
    detector: Session,
    embedder: Session,
    /// Per-stride output indices for strides [8, 16, 32], discovered by
    /// name at load time with a positional fallback.
    stride_outputs: [StrideOutputs; 3],
}

impl OnnxFaceAnalyzer {
    /// Load both models. Fails fast when either file is missing or does
    /// not look like the expected architecture.
    pub fn load(detector_path: &str, embedder_path: &str) -> Result<Self, AnalyzerError> {
        for path in [detector_path, embedder_path] {
            if !Path::new(path).exists() {
                return Err(AnalyzerError::ModelNotFound(path.to_string()));
            }
        }

        let detector = Session::builder()?
            .with_intra_threads(2).map_err(ort::Error::from)?
            .commit_from_file(detector_path)?;

        let output_names: Vec<String> = detector
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();

        tracing::info!(
            path = detector_path,
            outputs = ?output_names,
            "loaded face detection model"
        );

        if output_names.len() < 6 {
            return Err(AnalyzerError::InferenceFailed(format!(
                "detector needs at least 6 outputs (3 strides x score/bbox), got {}",
                output_names.len()
            )));
        }

        let stride_outputs = discover_stride_outputs(&output_names);
        tracing::debug!(?stride_outputs, "detector output tensor mapping");

        let embedder = Session::builder()?
            .with_intra_threads(2).map_err(ort::Error::from)?
            .commit_from_file(embedder_path)?;

        tracing::info!(path = embedder_path, "loaded face embedding model");

        Ok(Self {
            detector,
            embedder,
            stride_outputs,
        })
    }

    /// Detect faces, highest confidence first.
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Candidate>, AnalyzerError> {
        let (input, letterbox) =
            letterbox_tensor(frame, DET_INPUT_SIZE as u32, DET_MEAN, DET_STD);

        let outputs = self
            .detector
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut candidates = Vec::new();
        for (pos, &stride) in DET_STRIDES.iter().enumerate() {
            let (score_idx, bbox_idx) = self.stride_outputs[pos];

            let (_, scores) = outputs[score_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| AnalyzerError::InferenceFailed(format!("scores stride {stride}: {e}")))?;
            let (_, boxes) = outputs[bbox_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| AnalyzerError::InferenceFailed(format!("boxes stride {stride}: {e}")))?;

            decode_stride(
                scores,
                boxes,
                stride,
                &letterbox,
                DET_CONFIDENCE_THRESHOLD,
                &mut candidates,
            );
        }

        Ok(nms(candidates, DET_NMS_THRESHOLD))
    }

    /// Embed one detected face: margin crop, resize, run, L2-normalize.
    fn embed(&mut self, frame: &RgbImage, face: &Candidate) -> Result<Embedding, AnalyzerError> {
        let crop = crop_face(frame, face);
        let input = image_tensor(&crop, EMB_INPUT_SIZE as u32, EMB_MEAN, EMB_STD);

        let outputs = self
            .embedder
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| AnalyzerError::InferenceFailed(format!("embedding extraction: {e}")))?;

        if raw.len() != EMB_DIM {
            return Err(AnalyzerError::InferenceFailed(format!(
                "expected {EMB_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        Ok(Embedding::new(l2_normalize(raw)))
    }

    fn run_frame(&mut self, frame: &RgbImage) -> Result<Vec<Detection>, AnalyzerError> {
        let faces = self.detect(frame)?;
        let mut detections = Vec::with_capacity(faces.len());

        for face in &faces {
            // One bad crop must not cost the rest of the frame's faces.
            match self.embed(frame, face) {
                Ok(embedding) => detections.push(Detection {
                    bbox: to_bbox(face, frame.width(), frame.height()),
                    embedding,
                }),
                Err(e) => {
                    tracing::debug!(error = %e, score = face.score, "skipping face that failed to embed");
                }
            }
        }

        Ok(detections)
    }
}

impl FaceAnalyzer for OnnxFaceAnalyzer {
    fn analyze(&mut self, frame: &RgbImage) -> Vec<Detection> {
        match self.run_frame(frame) {
            Ok(detections) => detections,
            Err(e) => {
                tracing::warn!(error = %e, "face analysis failed for this frame");
                Vec::new()
            }
        }
    }

    fn embedding_dim(&self) -> usize {
        EMB_DIM
    }
}

/// Discover detector output ordering by name.
///
/// Exports of this model family either name tensors "score_8"/"bbox_8"/...
/// or use opaque numeric names. Named tensors are mapped directly; anything
/// else falls back to the conventional positional layout
/// ([0-2] = scores for strides 8/16/32, [3-5] = bboxes).
fn discover_stride_outputs(names: &[String]) -> [StrideOutputs; 3] {
    let find = |prefix: &str, stride: usize| -> Option<usize> {
        let target = format!("{prefix}_{stride}");
        names.iter().position(|n| n == &target)
    };

    let mut mapped = [(0usize, 0usize); 3];
    for (i, &stride) in DET_STRIDES.iter().enumerate() {
        match (find("score", stride), find("bbox", stride)) {
            (Some(score), Some(bbox)) => mapped[i] = (score, bbox),
            _ => {
                tracing::info!(
                    ?names,
                    "detector output names not recognized, using positional mapping"
                );
                return [(0, 3), (1, 4), (2, 5)];
            }
        }
    }
    mapped
}

/// Decode one stride level of the anchor-free detector into candidates,
/// mapped back to frame coordinates.
fn decode_stride(
    scores: &[f32],
    boxes: &[f32],
    stride: usize,
    letterbox: &Letterbox,
    threshold: f32,
    out: &mut Vec<Candidate>,
) {
    let grid = DET_INPUT_SIZE / stride;
    let num_anchors = grid * grid * DET_ANCHORS_PER_CELL;

    for idx in 0..num_anchors {
        let score = scores.get(idx).copied().unwrap_or(0.0);
        if score <= threshold {
            continue;
        }

        let cell = idx / DET_ANCHORS_PER_CELL;
        let anchor_cx = ((cell % grid) * stride) as f32;
        let anchor_cy = ((cell / grid) * stride) as f32;

        let off = idx * 4;
        if off + 3 >= boxes.len() {
            continue;
        }

        // Offsets are in stride units around the anchor center.
        let (x1, y1) = letterbox.unmap(
            anchor_cx - boxes[off] * stride as f32,
            anchor_cy - boxes[off + 1] * stride as f32,
        );
        let (x2, y2) = letterbox.unmap(
            anchor_cx + boxes[off + 2] * stride as f32,
            anchor_cy + boxes[off + 3] * stride as f32,
        );

        out.push(Candidate {
            x1,
            y1,
            x2,
            y2,
            score,
            class: 0,
        });
    }
}

/// Margin-expanded square-ish crop of a face, resized to the embedder input.
fn crop_face(frame: &RgbImage, face: &Candidate) -> RgbImage {
    let w = face.x2 - face.x1;
    let h = face.y2 - face.y1;
    let mx = w * CROP_MARGIN;
    let my = h * CROP_MARGIN;

    let x1 = (face.x1 - mx).max(0.0) as u32;
    let y1 = (face.y1 - my).max(0.0) as u32;
    let x2 = ((face.x2 + mx).max(0.0) as u32).min(frame.width());
    let y2 = ((face.y2 + my).max(0.0) as u32).min(frame.height());

    let cw = (x2.saturating_sub(x1)).max(1);
    let ch = (y2.saturating_sub(y1)).max(1);

    let view = imageops::crop_imm(frame, x1, y1, cw, ch).to_image();
    imageops::resize(
        &view,
        EMB_INPUT_SIZE as u32,
        EMB_INPUT_SIZE as u32,
        FilterType::Triangle,
    )
}

fn l2_normalize(raw: &[f32]) -> Vec<f32> {
    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|x| x / norm).collect()
    } else {
        raw.to_vec()
    }
}
