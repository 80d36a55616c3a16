//! Generic object detection backend via ONNX Runtime.
//!
//! Wraps a single-tensor detector (YOLOv8 family export: one output of
//! shape [1, 4 + num_classes, anchors], cxcywh boxes plus per-class
//! scores). Draws its own annotations and reports the distinct class
//! labels seen in the frame.

use crate::postprocess::{nms, to_bbox, Candidate};
use crate::prep::letterbox_tensor;
use image::RgbImage;
use lookout_core::{overlay, ObjectDetector, ObjectReport};
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const OBJ_INPUT_SIZE: usize = 640;
const OBJ_CONFIDENCE_THRESHOLD: f32 = 0.25;
const OBJ_NMS_THRESHOLD: f32 = 0.45;
const BOX_ATTRS: usize = 4;

/// Box colors cycled by class index.
const PALETTE: [overlay::Color; 6] = [
    [255, 140, 0],
    [0, 160, 255],
    [190, 90, 255],
    [255, 210, 0],
    [0, 210, 160],
    [255, 90, 150],
];

#[derive(Error, Debug)]
pub enum ObjectError {
    #[error("model file not found: {0} — place the ONNX models in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// ONNX-backed generic object detector.
pub struct OnnxObjectDetector {
    session: Session,
}

impl OnnxObjectDetector {
    pub fn load(model_path: &str) -> Result<Self, ObjectError> {
        if !Path::new(model_path).exists() {
            return Err(ObjectError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2).map_err(ort::Error::from)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded object detection model"
        );

        Ok(Self { session })
    }

    fn detect_objects(&mut self, frame: &RgbImage) -> Result<Vec<Candidate>, ObjectError> {
        // Input is scaled to [0, 1].
        let (input, letterbox) = letterbox_tensor(frame, OBJ_INPUT_SIZE as u32, 0.0, 255.0);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ObjectError::InferenceFailed(format!("prediction tensor: {e}")))?;

        let mut candidates = decode_predictions(data, OBJ_CONFIDENCE_THRESHOLD);
        for c in &mut candidates {
            let (x1, y1) = letterbox.unmap(c.x1, c.y1);
            let (x2, y2) = letterbox.unmap(c.x2, c.y2);
            (c.x1, c.y1, c.x2, c.y2) = (x1, y1, x2, y2);
        }

        Ok(nms(candidates, OBJ_NMS_THRESHOLD))
    }
}

impl ObjectDetector for OnnxObjectDetector {
    fn detect(&mut self, frame: &RgbImage) -> ObjectReport {
        let candidates = match self.detect_objects(frame) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "object detection failed for this frame");
                return ObjectReport {
                    annotated: frame.clone(),
                    labels: Vec::new(),
                };
            }
        };

        let mut annotated = frame.clone();
        let mut labels: Vec<String> = Vec::new();

        for c in &candidates {
            let name = class_name(c.class);
            let color = PALETTE[c.class % PALETTE.len()];
            let bbox = to_bbox(c, frame.width(), frame.height());

            overlay::draw_box(&mut annotated, &bbox, color, 2);
            overlay::draw_label(
                &mut annotated,
                bbox.x1,
                bbox.y1 - overlay::label_height() as i32 - 4,
                &format!("{name} {:.2}", c.score),
                color,
            );

            if !labels.iter().any(|l| l == name) {
                labels.push(name.to_string());
            }
        }

        ObjectReport { annotated, labels }
    }
}

/// Decode a [1, 4 + num_classes, anchors] prediction tensor: per anchor,
/// take the best class score; keep anchors above the threshold as
/// corner-form candidates in model space.
fn decode_predictions(data: &[f32], threshold: f32) -> Vec<Candidate> {
    let attrs = BOX_ATTRS + COCO_CLASSES.len();
    if data.len() % attrs != 0 {
        tracing::warn!(
            len = data.len(),
            attrs,
            "prediction tensor has unexpected layout, skipping frame"
        );
        return Vec::new();
    }
    let anchors = data.len() / attrs;
    let at = |attr: usize, anchor: usize| data[attr * anchors + anchor];

    let mut out = Vec::new();
    for a in 0..anchors {
        let mut best_class = 0;
        let mut best_score = 0.0f32;
        for class in 0..COCO_CLASSES.len() {
            let score = at(BOX_ATTRS + class, a);
            if score > best_score {
                best_score = score;
                best_class = class;
            }
        }
        if best_score <= threshold {
            continue;
        }

        let (cx, cy, w, h) = (at(0, a), at(1, a), at(2, a), at(3, a));
        out.push(Candidate {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
            score: best_score,
            class: best_class,
        });
    }
    out
}

fn class_name(class: usize) -> &'static str {
    COCO_CLASSES.get(class).copied().unwrap_or("object")
}

/// COCO class names in model output order.
const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];
