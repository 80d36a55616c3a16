//! Detection post-processing shared by both backends: IoU, NMS and
//! candidate-to-bbox conversion.

use lookout_core::BoundingBox;

/// A decoded detection candidate in frame coordinates, before NMS.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    /// Class index; always 0 for the face detector.
    pub class: usize,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }
}

/// Intersection-over-Union of two candidates.
pub fn iou(a: &Candidate, b: &Candidate) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.area() + b.area() - inter;

    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

/// Class-aware Non-Maximum Suppression: candidates of the same class that
/// overlap a higher-scoring survivor beyond `iou_threshold` are dropped.
/// Output is sorted by descending score.
pub fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Candidate> = Vec::new();
    let mut suppressed = vec![false; candidates.len()];

    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(candidates[i]);

        for j in (i + 1)..candidates.len() {
            if suppressed[j] || candidates[j].class != candidates[i].class {
                continue;
            }
            if iou(&candidates[i], &candidates[j]) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Round a candidate to integer corners clamped into the frame.
pub fn to_bbox(c: &Candidate, frame_w: u32, frame_h: u32) -> BoundingBox {
    BoundingBox {
        x1: c.x1.round() as i32,
        y1: c.y1.round() as i32,
        x2: c.x2.round() as i32,
        y2: c.y2.round() as i32,
    }
    .clamped(frame_w, frame_h)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(x1: f32, y1: f32, x2: f32, y2: f32, score: f32, class: usize) -> Candidate {
        Candidate { x1, y1, x2, y2, score, class }
    }

    #[test]
    fn test_iou_identical() {
        let a = cand(0.0, 0.0, 100.0, 100.0, 1.0, 0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = cand(0.0, 0.0, 10.0, 10.0, 1.0, 0);
        let b = cand(20.0, 20.0, 30.0, 30.0, 1.0, 0);
        assert!(iou(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = cand(0.0, 0.0, 10.0, 10.0, 1.0, 0);
        let b = cand(5.0, 0.0, 15.0, 10.0, 1.0, 0);
        // inter 50, union 150
        assert!((iou(&a, &b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_same_class() {
        let result = nms(
            vec![
                cand(0.0, 0.0, 100.0, 100.0, 0.9, 0),
                cand(5.0, 5.0, 105.0, 105.0, 0.8, 0),
                cand(200.0, 200.0, 250.0, 250.0, 0.7, 0),
            ],
            0.4,
        );
        assert_eq!(result.len(), 2);
        assert!((result[0].score - 0.9).abs() < 1e-6);
        assert!((result[1].score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_nms_keeps_overlapping_different_classes() {
        let result = nms(
            vec![
                cand(0.0, 0.0, 100.0, 100.0, 0.9, 0),
                cand(5.0, 5.0, 105.0, 105.0, 0.8, 7),
            ],
            0.4,
        );
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_nms_empty() {
        assert!(nms(vec![], 0.4).is_empty());
    }

    #[test]
    fn test_to_bbox_clamps() {
        let c = cand(-3.7, 2.2, 700.9, 400.4, 0.5, 0);
        let b = to_bbox(&c, 640, 480);
        assert_eq!(b.x1, 0);
        assert_eq!(b.y1, 2);
        assert_eq!(b.x2, 639);
        assert_eq!(b.y2, 400);
    }
}
