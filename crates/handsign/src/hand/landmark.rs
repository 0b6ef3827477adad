//! Hand landmark prediction.

use std::path::Path;

use tract_onnx::prelude::tract_ndarray::Ix2;

use crate::{
    image::Image,
    iter::zip_exact,
    landmark::Landmark,
    nn::{Cnn, ColorMapper, NeuralNetwork, Outputs},
    rect::RotatedRect,
    resolution::Resolution,
};

/// Number of landmarks estimated for every hand.
pub const NUM_LANDMARKS: usize = 21;

/// The 21 landmarks of a single hand, plus the landmark network's confidence values.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    points: [Landmark; NUM_LANDMARKS],
    presence: f32,
    handedness: Handedness,
}

impl HandLandmarks {
    pub fn new(points: [Landmark; NUM_LANDMARKS], presence: f32, handedness: Handedness) -> Self {
        Self {
            points,
            presence,
            handedness,
        }
    }

    /// Creates a hand from landmark positions only, with a presence of 1.0.
    pub fn from_points(points: [Landmark; NUM_LANDMARKS]) -> Self {
        Self::new(points, 1.0, Handedness::Right)
    }

    /// Returns the landmark at `idx`.
    #[inline]
    pub fn get(&self, idx: LandmarkIdx) -> Landmark {
        self.points[idx as usize]
    }

    /// Returns all landmarks, in [`LandmarkIdx`] order.
    #[inline]
    pub fn as_slice(&self) -> &[Landmark] {
        &self.points
    }

    /// Returns the probability that the region passed to the landmark network contains a hand.
    #[inline]
    pub fn presence(&self) -> f32 {
        self.presence
    }

    /// Returns the estimated handedness of the hand in the image.
    ///
    /// This assumes that the camera image is passed in as-is (not mirrored), and should only be
    /// relied on when [`HandLandmarks::presence`] is over some threshold.
    #[inline]
    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    /// Applies `f` to the position of every landmark.
    #[must_use]
    pub fn map_positions(mut self, mut f: impl FnMut([f32; 3]) -> [f32; 3]) -> Self {
        for lm in &mut self.points {
            *lm = lm.map(&mut f);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

/// Names for the hand pose landmarks.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles near the palm of
///   the hand.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: This landmark is just placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// The full-range hand landmark estimation network (`hand_landmark_full.onnx`).
///
/// Takes a square crop around a hand, rotated so that the fingers point up, and estimates the
/// positions of the 21 hand landmarks inside of it.
#[derive(Clone)]
pub struct LandmarkNetwork {
    cnn: Cnn,
}

impl LandmarkNetwork {
    /// Loads the network from an ONNX file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let cnn = Cnn::new(
            NeuralNetwork::from_path(path)?,
            ColorMapper::linear(0.0..=1.0),
        )?;
        Ok(Self { cnn })
    }

    pub fn input_resolution(&self) -> Resolution {
        self.cnn.input_resolution()
    }

    /// Estimates the landmarks of the hand inside `region` of `image`.
    ///
    /// The returned landmarks are in the pixel coordinate system of `image`. The Z coordinate uses
    /// the same scale as the X coordinate.
    pub fn estimate(&self, image: &Image, region: &RotatedRect) -> anyhow::Result<HandLandmarks> {
        let outputs = self.cnn.estimate(image, region)?;
        let raw = extract(&outputs)?;

        let input_res = self.input_resolution();
        let sx = region.rect().width() / input_res.width() as f32;
        let sy = region.rect().height() / input_res.height() as f32;
        Ok(raw.map_positions(|[x, y, z]| {
            let [x, y] = region.transform_out(x * sx, y * sy);
            [x, y, z * sx]
        }))
    }
}

/// Reads the landmarks from the network outputs, in the network's input coordinate system.
fn extract(outputs: &Outputs) -> anyhow::Result<HandLandmarks> {
    let screen_landmarks = outputs.view(0, &[1, 63])?.into_dimensionality::<Ix2>()?;
    let presence_flag = outputs.view(1, &[1, 1])?.into_dimensionality::<Ix2>()?;
    let handedness = outputs.view(2, &[1, 1])?.into_dimensionality::<Ix2>()?;
    // Output 3 holds metric world coordinates, which are not needed.
    outputs.view(3, &[1, 63])?;

    let raw_handedness = handedness[[0, 0]];
    let handedness = if raw_handedness > 0.5 {
        Handedness::Right
    } else {
        Handedness::Left
    };

    let coords: Vec<f32> = screen_landmarks.iter().copied().collect();
    let mut points = [Landmark::default(); NUM_LANDMARKS];
    for (chunk, out) in zip_exact(coords.chunks_exact(3), &mut points) {
        *out = Landmark::new([chunk[0], chunk[1], chunk[2]]);
    }

    Ok(HandLandmarks::new(points, presence_flag[[0, 0]], handedness))
}
