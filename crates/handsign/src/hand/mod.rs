//! Hand detection and landmark estimation.
//!
//! Finding the landmarks of a hand is done in two stages, as in MediaPipe Hands. First, the
//! [`PalmDetector`] locates palms in the whole image. The most confident palm is then turned into
//! a rotated region of interest that covers the whole hand, which the [`LandmarkNetwork`] uses to
//! estimate the positions of the 21 hand landmarks.

pub mod detection;
pub mod landmark;

use std::path::Path;

use anyhow::Context;
use nalgebra::{Rotation2, Vector2};

use crate::{
    detection::Detection,
    image::Image,
    predict::HandDetector,
    rect::{Rect, RotatedRect},
    resolution::Resolution,
    timer::Timer,
};

use self::{
    detection::PalmDetector,
    landmark::{HandLandmarks, LandmarkNetwork},
};

/// File name of the palm detection model inside of a model directory.
pub const PALM_MODEL: &str = "palm_detection_full.onnx";
/// File name of the hand landmark model inside of a model directory.
pub const LANDMARK_MODEL: &str = "hand_landmark_full.onnx";

/// Palm size to hand size grow factor.
const ROI_SCALE: f32 = 2.6;
/// Shift of the hand region towards the fingers, relative to the palm height.
const ROI_SHIFT_Y: f32 = -0.5;
/// Hands whose landmark presence score is below this value are dropped.
const PRESENCE_THRESHOLD: f32 = 0.5;

/// The neural [`HandDetector`]: palm detection followed by landmark estimation.
pub struct HandLandmarker {
    palm: PalmDetector,
    landmarks: LandmarkNetwork,
}

impl HandLandmarker {
    pub fn new(palm: PalmDetector, landmarks: LandmarkNetwork) -> Self {
        Self { palm, landmarks }
    }

    /// Loads both networks from `model_dir`, expecting [`PALM_MODEL`] and [`LANDMARK_MODEL`] in it.
    pub fn load<P: AsRef<Path>>(model_dir: P) -> anyhow::Result<Self> {
        let dir = model_dir.as_ref();
        let palm = PalmDetector::from_path(dir.join(PALM_MODEL))
            .context("failed to load palm detection network")?;
        let landmarks = LandmarkNetwork::from_path(dir.join(LANDMARK_MODEL))
            .context("failed to load hand landmark network")?;
        log::debug!(
            "loaded hand networks from '{}' (palm threshold {}, landmark input {})",
            dir.display(),
            palm.threshold(),
            landmarks.input_resolution(),
        );
        Ok(Self::new(palm, landmarks))
    }

    pub fn palm_detector_mut(&mut self) -> &mut PalmDetector {
        &mut self.palm
    }
}

impl HandDetector for HandLandmarker {
    fn detect(&self, image: &Image) -> anyhow::Result<Option<HandLandmarks>> {
        let mut t_palm = Timer::new("palm");
        let mut t_landmark = Timer::new("landmark");

        let palms = t_palm.time(|| self.palm.detect(image))?;
        let Some(palm) = palms.first() else {
            log::trace!("no palm found; {t_palm}");
            return Ok(None);
        };
        log::trace!(
            "{} palm(s), best confidence {:.2}",
            palms.len(),
            palm.confidence()
        );

        let roi = hand_region(palm);
        let hand = t_landmark.time(|| self.landmarks.estimate(image, &roi))?;
        log::trace!("{t_palm}, {t_landmark}");

        if hand.presence() < PRESENCE_THRESHOLD {
            log::trace!("hand presence {:.2} is below threshold", hand.presence());
            return Ok(None);
        }

        Ok(Some(normalize(hand, image.resolution())))
    }
}

/// Converts landmarks from pixel coordinates to coordinates relative to the image size.
///
/// Depth uses the same scale as X.
fn normalize(hand: HandLandmarks, res: Resolution) -> HandLandmarks {
    let (w, h) = (res.width() as f32, res.height() as f32);
    hand.map_positions(|[x, y, z]| [x / w, y / h, z / w])
}

/// Computes the region of interest for the landmark network from a palm detection.
///
/// The region is rotated like the palm, moved towards the fingers and grown to a square that
/// fits the whole hand.
pub fn hand_region(palm: &Detection) -> RotatedRect {
    let rect = palm.bounding_rect();
    let angle = palm.angle();

    let shift = Rotation2::new(angle) * Vector2::new(0.0, ROI_SHIFT_Y * rect.height());
    let center = rect.center() + shift;
    let size = rect.width().max(rect.height()) * ROI_SCALE;

    RotatedRect::new(Rect::from_center(center.x, center.y, size, size), angle)
}
