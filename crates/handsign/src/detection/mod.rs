//! Common functionality for object detection.
//!
//! The functionality defined in this module (and submodules) is meant to be reusable across
//! different single-class detectors.

pub mod nms;
pub mod ssd;

use crate::image::Image;
use crate::nn::{Cnn, Outputs};
use crate::rect::{Rect, RotatedRect};
use crate::resolution::{AspectRatio, Resolution};
use crate::timer::Timer;

use self::nms::NonMaxSuppression;

/// Trait implemented by neural networks that detect objects in an input image.
pub trait Network: Send + Sync + 'static {
    /// Returns the [`Cnn`] to use for detection.
    fn cnn(&self) -> &Cnn;

    /// Extracts all detections with confidence above `threshold` from the network's output.
    ///
    /// Keypoint and detection positions are expected to be in the coordinate system of the
    /// network's input. Returns an error if the network outputs do not have the expected shape.
    fn extract(
        &self,
        outputs: &Outputs,
        threshold: f32,
        detections: &mut Vec<Detection>,
    ) -> anyhow::Result<()>;
}

/// A generic object detector.
///
/// This type wraps a [`Network`] for object detection. Detection does not mutate the detector, so
/// a single instance can be shared between threads.
pub struct Detector {
    network: Box<dyn Network>,
    thresh: f32,
    nms: NonMaxSuppression,
}

impl Detector {
    pub const DEFAULT_THRESHOLD: f32 = 0.5;

    pub fn new<N: Network>(network: N) -> Self {
        Self {
            network: Box::new(network),
            thresh: Self::DEFAULT_THRESHOLD,
            nms: NonMaxSuppression::new(),
        }
    }

    pub fn input_resolution(&self) -> Resolution {
        self.network.cnn().input_resolution()
    }

    #[inline]
    pub fn threshold(&self) -> f32 {
        self.thresh
    }

    #[inline]
    pub fn set_threshold(&mut self, thresh: f32) {
        self.thresh = thresh;
    }

    /// Runs the network on `image` and returns all detections, in image pixel coordinates.
    ///
    /// Detections are ordered by descending confidence.
    pub fn detect(&self, image: &Image) -> anyhow::Result<Vec<Detection>> {
        let mut t_infer = Timer::new("infer");
        let mut t_extract = Timer::new("extract");
        let mut t_nms = Timer::new("nms");

        let cnn = self.network.cnn();
        let input_res = cnn.input_resolution();

        // If the input image's aspect ratio doesn't match the CNN's input, sample an oversized
        // region that does.
        let aspect = input_res.aspect_ratio().unwrap_or(AspectRatio::SQUARE);
        let rect = image.rect().grow_to_fit_aspect(aspect);
        let outputs = t_infer.time(|| cnn.estimate(image, &RotatedRect::from(rect)))?;

        let mut detections = Vec::new();
        t_extract.time(|| self.network.extract(&outputs, self.thresh, &mut detections))?;
        let raw_count = detections.len();

        let mut detections = t_nms.time(|| self.nms.process(detections));

        map_to_image(&mut detections, rect, input_res);

        log::trace!(
            "{} raw detections, {} after NMS; {t_infer}, {t_extract}, {t_nms}",
            raw_count,
            detections.len(),
        );

        Ok(detections)
    }
}

/// Maps `detections` from the network's input coordinate system back into the image.
///
/// `rect` is the region of the image that was resized to `input_res` for the network. It may
/// extend past the image borders to letterbox the image.
fn map_to_image(detections: &mut [Detection], rect: Rect, input_res: Resolution) {
    let scale = rect.width() / input_res.width() as f32;
    for det in detections {
        // Scale to `rect`'s size first.
        let center = det.rect.center();
        det.rect = Rect::from_center(
            center.x * scale,
            center.y * scale,
            det.rect.width() * scale,
            det.rect.height() * scale,
        );
        for kp in &mut det.keypoints {
            kp.x *= scale;
            kp.y *= scale;
        }

        // Now remove the offset added by the oversized rectangle (this compensates for
        // "black bars" added to adjust the aspect ratio).
        det.rect = det.rect.move_by(rect.x(), rect.y());
        for kp in &mut det.keypoints {
            kp.x += rect.x();
            kp.y += rect.y();
        }
    }
}

/// A detected object.
///
/// A [`Detection`] consists of a [`Rect`] enclosing the detected object, a confidence value, an
/// optional rotation angle of the object, and a possibly empty set of located keypoints.
///
/// Per convention, the confidence value lies between 0.0 and 1.0, which can be achieved by passing
/// the raw network output through [`crate::num::sigmoid`]. The confidence value is used as the
/// weight when performing non-maximum averaging with [`nms::NonMaxSuppression`].
#[derive(Debug, Clone)]
pub struct Detection {
    confidence: f32,
    angle: f32,
    rect: Rect,
    keypoints: Vec<Keypoint>,
}

impl Detection {
    pub fn new(confidence: f32, rect: Rect) -> Self {
        Self::with_keypoints(confidence, rect, Vec::new())
    }

    pub fn with_keypoints(confidence: f32, rect: Rect, keypoints: Vec<Keypoint>) -> Self {
        Self {
            confidence,
            angle: 0.0,
            rect,
            keypoints,
        }
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Returns the angle of the detected object, in radians, clockwise.
    ///
    /// Not all networks support computing the object angle. If it is not supported, an angle of
    /// 0.0 will be returned.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Sets the angle of the detected object, in radians, clockwise.
    pub fn set_angle(&mut self, angle: f32) {
        self.angle = angle;
    }

    /// Returns the axis-aligned bounding rectangle containing the detected object.
    pub fn bounding_rect(&self) -> Rect {
        self.rect
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }
}

/// A 2D keypoint produced as part of a [`Detection`].
///
/// The meaning of a keypoint depends on the specific detector and on its index in the keypoint
/// list. Typically keypoints are used to crop/rotate a detected object for further processing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    x: f32,
    y: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }
}
