//! Palm detection.

use std::path::Path;

use nalgebra::{Rotation2, Vector2};
use tract_onnx::prelude::tract_ndarray::{s, ArrayView1, Ix3};

use crate::detection::{
    ssd::{Anchor, AnchorParams, Anchors, LayerInfo},
    Detection, Detector, Network,
};
use crate::image::Image;
use crate::nn::{Cnn, ColorMapper, NeuralNetwork, Outputs};
use crate::num::sigmoid;
use crate::rect::Rect;
use crate::resolution::Resolution;

/// A keypoint of a palm [`Detection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keypoint {
    Wrist = 0,
    IndexFingerMcp = 1,
    MiddleFingerMcp = 2,
    RingFingerMcp = 3,
    PinkyMcp = 4,
    ThumbCmc = 5,
    ThumbMcp = 6,
}

const NUM_KEYPOINTS: usize = 7;
const BOX_PARAMS: usize = 4 + 2 * NUM_KEYPOINTS;

/// The full-range palm detection network (`palm_detection_full.onnx`).
pub struct PalmNetwork {
    cnn: Cnn,
    anchors: Anchors,
}

impl PalmNetwork {
    /// Loads the network from an ONNX file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let cnn = Cnn::new(
            NeuralNetwork::from_path(path)?,
            ColorMapper::linear(0.0..=1.0),
        )?;
        Ok(Self::new(cnn))
    }

    fn new(cnn: Cnn) -> Self {
        Self {
            cnn,
            anchors: palm_anchors(),
        }
    }
}

fn palm_anchors() -> Anchors {
    Anchors::calculate(&AnchorParams {
        layers: &[LayerInfo::new(2, 24, 24), LayerInfo::new(6, 12, 12)],
    })
}

impl Network for PalmNetwork {
    fn cnn(&self) -> &Cnn {
        &self.cnn
    }

    fn extract(
        &self,
        outputs: &Outputs,
        threshold: f32,
        detections: &mut Vec<Detection>,
    ) -> anyhow::Result<()> {
        extract_outputs(
            &self.anchors,
            self.cnn.input_resolution(),
            outputs,
            threshold,
            detections,
        )
    }
}

fn extract_outputs(
    anchors: &Anchors,
    input_res: Resolution,
    outputs: &Outputs,
    thresh: f32,
    detections: &mut Vec<Detection>,
) -> anyhow::Result<()> {
    let num_anchors = anchors.anchor_count();
    let boxes = outputs
        .view(0, &[1, num_anchors, BOX_PARAMS])?
        .into_dimensionality::<Ix3>()?;
    let confidences = outputs
        .view(1, &[1, num_anchors, 1])?
        .into_dimensionality::<Ix3>()?;

    for (index, anchor) in anchors.iter().enumerate() {
        let conf = sigmoid(confidences[[0, index, 0]]);
        if conf < thresh {
            continue;
        }

        let box_params = boxes.slice(s![0, index, ..]);
        detections.push(extract_detection(anchor, input_res, box_params, conf));
    }

    Ok(())
}

fn extract_detection(
    anchor: &Anchor,
    input_res: Resolution,
    box_params: ArrayView1<'_, f32>,
    confidence: f32,
) -> Detection {
    let input_w = input_res.width() as f32;
    let input_h = input_res.height() as f32;

    let xc = box_params[0] + anchor.x_center() * input_w;
    let yc = box_params[1] + anchor.y_center() * input_h;
    let w = box_params[2];
    let h = box_params[3];
    let keypoints = (0..NUM_KEYPOINTS)
        .map(|i| {
            crate::detection::Keypoint::new(
                box_params[4 + 2 * i] + anchor.x_center() * input_w,
                box_params[5 + 2 * i] + anchor.y_center() * input_h,
            )
        })
        .collect();

    let mut det = Detection::with_keypoints(confidence, Rect::from_center(xc, yc, w, h), keypoints);
    det.set_angle(palm_angle(&det));
    det
}

/// Computes the clockwise rotation of a palm from its wrist and middle finger keypoints.
///
/// An angle of 0.0 means the fingers point straight up.
fn palm_angle(det: &Detection) -> f32 {
    let finger = det.keypoints()[Keypoint::MiddleFingerMcp as usize];
    let wrist = det.keypoints()[Keypoint::Wrist as usize];

    let rel = Vector2::new(wrist.x() - finger.x(), wrist.y() - finger.y());
    Rotation2::rotation_between(&Vector2::y(), &rel).angle()
}

/// Detects palms in full images.
pub struct PalmDetector {
    detector: Detector,
}

impl PalmDetector {
    /// Palms detected with a lower confidence are discarded.
    pub const DEFAULT_THRESHOLD: f32 = 0.7;

    pub fn new(network: PalmNetwork) -> Self {
        let mut detector = Detector::new(network);
        detector.set_threshold(Self::DEFAULT_THRESHOLD);
        Self { detector }
    }

    /// Loads the palm detection network from `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Ok(Self::new(PalmNetwork::from_path(path)?))
    }

    pub fn set_threshold(&mut self, thresh: f32) {
        self.detector.set_threshold(thresh);
    }

    pub fn threshold(&self) -> f32 {
        self.detector.threshold()
    }

    /// Returns all palms in `image`, most confident first.
    ///
    /// Positions are in pixel coordinates of `image`.
    pub fn detect(&self, image: &Image) -> anyhow::Result<Vec<Detection>> {
        self.detector.detect(image)
    }
}
