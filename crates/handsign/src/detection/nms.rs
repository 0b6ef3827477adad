//! Non-Maximum Suppression and Averaging.
//!
//! Single-Shot MultiBox Detectors (SSD) like the palm detector produce many duplicate detections
//! for a single object. Non-Maximum Suppression (NMS) filters these duplicates out, leaving only a
//! single detection with high confidence for each object.
//!
//! Rather than discarding the overlapping detections, this implementation computes their
//! confidence-weighted average (Non-Maximum Averaging), like MediaPipe does for palms.

use crate::{iter::zip_exact, num::TotalF32, rect::Rect};

use super::{Detection, Keypoint};

/// A non-maximum suppression algorithm.
#[derive(Debug, Clone)]
pub struct NonMaxSuppression {
    iou_thresh: f32,
}

impl NonMaxSuppression {
    /// The default intersection-over-union threshold used to determine if two detections overlap.
    pub const DEFAULT_IOU_THRESH: f32 = 0.3;

    /// Creates a new non-maximum suppressor using [`Self::DEFAULT_IOU_THRESH`].
    pub fn new() -> Self {
        Self {
            iou_thresh: Self::DEFAULT_IOU_THRESH,
        }
    }

    /// Performs non-maximum suppression on `detections`.
    ///
    /// The filtered detections are returned in order of descending confidence.
    pub fn process(&self, mut detections: Vec<Detection>) -> Vec<Detection> {
        let mut out = Vec::new();

        // Sort by ascending confidence, process highest confidence first by starting at the back.
        detections.sort_unstable_by_key(|det| TotalF32(det.confidence));

        while let Some(seed) = detections.pop() {
            let seed_rect = seed.bounding_rect();
            let (overlapping, rest): (Vec<_>, Vec<_>) = detections
                .into_iter()
                .partition(|other| seed_rect.iou(&other.bounding_rect()) >= self.iou_thresh);
            detections = rest;

            if overlapping.is_empty() {
                out.push(seed);
            } else {
                let confidence = seed.confidence();
                let mut group = overlapping;
                group.push(seed);
                out.push(average(confidence, &group));
            }
        }

        out
    }
}

impl Default for NonMaxSuppression {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes the confidence-weighted average of the overlapping detections in `group`.
///
/// The result keeps the seed's `confidence`.
fn average(confidence: f32, group: &[Detection]) -> Detection {
    let keypoint_count = group[0].keypoints().len();
    let mut keypoints = vec![Keypoint::new(0.0, 0.0); keypoint_count];
    let (mut x, mut y, mut w, mut h, mut angle) = (0.0, 0.0, 0.0, 0.0, 0.0);
    let mut divisor = 0.0;

    for det in group {
        let factor = det.confidence;
        divisor += factor;
        for (acc, kp) in zip_exact(&mut keypoints, &det.keypoints) {
            acc.x += kp.x * factor;
            acc.y += kp.y * factor;
        }
        let rect = det.bounding_rect();
        x += rect.center().x * factor;
        y += rect.center().y * factor;
        w += rect.width() * factor;
        h += rect.height() * factor;
        angle += det.angle * factor;
    }

    for kp in &mut keypoints {
        kp.x /= divisor;
        kp.y /= divisor;
    }

    let rect = Rect::from_center(x / divisor, y / divisor, w / divisor, h / divisor);
    let mut det = Detection::with_keypoints(confidence, rect, keypoints);
    det.set_angle(angle / divisor);
    det
}
