//! Gesture classification from hand landmarks.
//!
//! Gestures are recognized by comparing the heights of the fingertips with the height of the index
//! finger's knuckle ([`LandmarkIdx::IndexFingerMcp`]). This only works for an upright hand facing
//! the camera, but needs no training data.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::{
    hand::landmark::{LandmarkIdx, NUM_LANDMARKS},
    landmark::Landmark,
};

/// A recognized hand gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    /// All four fingers curled below the knuckles.
    Fist,
    /// All four fingers extended above the knuckles.
    OpenPalm,
    /// Index and middle finger extended, ring finger and pinky curled.
    PeaceSign,
    /// Thumbs up: thumb extended, index and middle finger curled.
    Like,
    /// A hand was found, but it did not match any known gesture.
    Unknown,
}

impl Gesture {
    pub fn label(&self) -> &'static str {
        match self {
            Gesture::Fist => "Fist",
            Gesture::OpenPalm => "Open Palm",
            Gesture::PeaceSign => "Peace Sign",
            Gesture::Like => "Like",
            Gesture::Unknown => "Unknown Gesture",
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors returned by [`classify`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifyError {
    #[error("expected 21 hand landmarks, got {0}")]
    LandmarkCount(usize),
    #[error("landmark {0:?} has a non-finite coordinate")]
    NonFinite(LandmarkIdx),
}

/// The landmark heights the classification rules look at.
///
/// Y grows downwards, so a tip is "above" the knuckle if its Y coordinate is *smaller*.
struct Fingers {
    thumb: f32,
    index: f32,
    middle: f32,
    ring: f32,
    pinky: f32,
    mcp: f32,
}

impl Fingers {
    fn above(&self, tip: f32) -> bool {
        tip < self.mcp
    }

    fn below(&self, tip: f32) -> bool {
        tip > self.mcp
    }

    fn is_fist(&self) -> bool {
        self.below(self.index)
            && self.below(self.middle)
            && self.below(self.ring)
            && self.below(self.pinky)
    }

    fn is_open_palm(&self) -> bool {
        self.above(self.index)
            && self.above(self.middle)
            && self.above(self.ring)
            && self.above(self.pinky)
    }

    fn is_peace_sign(&self) -> bool {
        self.above(self.index)
            && self.above(self.middle)
            && self.below(self.ring)
            && self.below(self.pinky)
    }

    fn is_like(&self) -> bool {
        self.above(self.thumb) && self.below(self.index) && self.below(self.middle)
    }
}

type Rule = fn(&Fingers) -> bool;

/// Classification rules, in order of priority. The first matching rule wins.
const RULES: &[(Gesture, Rule)] = &[
    (Gesture::Fist, Fingers::is_fist),
    (Gesture::OpenPalm, Fingers::is_open_palm),
    (Gesture::PeaceSign, Fingers::is_peace_sign),
    (Gesture::Like, Fingers::is_like),
];

/// Classifies the 21 landmarks of a hand into a [`Gesture`].
///
/// `landmarks` must be in [`LandmarkIdx`] order and use a coordinate system where smaller Y values
/// are higher up in the image. If no rule matches, [`Gesture::Unknown`] is returned.
pub fn classify(landmarks: &[Landmark]) -> Result<Gesture, ClassifyError> {
    if landmarks.len() != NUM_LANDMARKS {
        return Err(ClassifyError::LandmarkCount(landmarks.len()));
    }

    let y = |idx: LandmarkIdx| {
        let lm = landmarks[idx as usize];
        if lm.is_finite() {
            Ok(lm.y())
        } else {
            Err(ClassifyError::NonFinite(idx))
        }
    };
    let fingers = Fingers {
        thumb: y(LandmarkIdx::ThumbTip)?,
        index: y(LandmarkIdx::IndexFingerTip)?,
        middle: y(LandmarkIdx::MiddleFingerTip)?,
        ring: y(LandmarkIdx::RingFingerTip)?,
        pinky: y(LandmarkIdx::PinkyTip)?,
        mcp: y(LandmarkIdx::IndexFingerMcp)?,
    };

    let gesture = RULES
        .iter()
        .find(|(_, rule)| rule(&fingers))
        .map_or(Gesture::Unknown, |(gesture, _)| *gesture);
    Ok(gesture)
}

/// The response to a gesture prediction request: a label and a confidence score.
///
/// The confidence is 1.0 if a hand was found and classified (including [`Gesture::Unknown`]), and
/// 0.0 otherwise. It does not reflect how certain the classification is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GestureResult {
    #[serde(rename = "gesture", serialize_with = "serialize_label")]
    label: Label,
    confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Gesture(Gesture),
    NoHand,
    Error,
}

impl Label {
    fn as_str(&self) -> &'static str {
        match self {
            Label::Gesture(gesture) => gesture.label(),
            Label::NoHand => "No Gesture",
            Label::Error => "Error",
        }
    }
}

fn serialize_label<S: Serializer>(label: &Label, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(label.as_str())
}

impl GestureResult {
    /// A hand was found and classified.
    pub fn recognized(gesture: Gesture) -> Self {
        Self {
            label: Label::Gesture(gesture),
            confidence: 1.0,
        }
    }

    /// No hand was found in the image.
    pub fn no_hand() -> Self {
        Self {
            label: Label::NoHand,
            confidence: 0.0,
        }
    }

    /// A hand was found, but its landmarks could not be classified.
    pub fn error() -> Self {
        Self {
            label: Label::Error,
            confidence: 0.0,
        }
    }

    /// Returns the label sent to clients.
    pub fn label(&self) -> &'static str {
        self.label.as_str()
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Returns the recognized [`Gesture`], if any.
    pub fn gesture(&self) -> Option<Gesture> {
        match self.label {
            Label::Gesture(gesture) => Some(gesture),
            Label::NoHand | Label::Error => None,
        }
    }
}

impl From<Result<Gesture, ClassifyError>> for GestureResult {
    fn from(res: Result<Gesture, ClassifyError>) -> Self {
        match res {
            Ok(gesture) => Self::recognized(gesture),
            Err(e) => {
                log::error!("gesture classification failed: {e}");
                Self::error()
            }
        }
    }
}

impl fmt::Display for GestureResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.1})", self.label(), self.confidence)
    }
}

#[cfg(test)]
mod tests {
    use crate::test::hand_with_heights;

    use super::*;
    use LandmarkIdx::*;

    const UP: f32 = 0.2;
    const MCP: f32 = 0.5;
    const DOWN: f32 = 0.8;

    fn classify_heights(heights: &[(LandmarkIdx, f32)]) -> Result<Gesture, ClassifyError> {
        let mut all = vec![(IndexFingerMcp, MCP)];
        all.extend_from_slice(heights);
        classify(hand_with_heights(&all).as_slice())
    }

    fn fingers(index: f32, middle: f32, ring: f32, pinky: f32) -> Vec<(LandmarkIdx, f32)> {
        vec![
            (IndexFingerTip, index),
            (MiddleFingerTip, middle),
            (RingFingerTip, ring),
            (PinkyTip, pinky),
        ]
    }

    #[test]
    fn fist() {
        assert_eq!(classify_heights(&fingers(DOWN, DOWN, DOWN, DOWN)), Ok(Gesture::Fist));
    }

    #[test]
    fn fist_wins_over_like() {
        // A raised thumb also satisfies the "Like" rule, but "Fist" comes first.
        let mut heights = fingers(DOWN, DOWN, DOWN, DOWN);
        heights.push((ThumbTip, UP));
        assert_eq!(classify_heights(&heights), Ok(Gesture::Fist));
    }

    #[test]
    fn open_palm() {
        assert_eq!(classify_heights(&fingers(UP, UP, UP, UP)), Ok(Gesture::OpenPalm));
    }

    #[test]
    fn peace_sign() {
        assert_eq!(classify_heights(&fingers(UP, UP, DOWN, DOWN)), Ok(Gesture::PeaceSign));
    }

    #[test]
    fn like() {
        let mut heights = fingers(DOWN, DOWN, UP, DOWN);
        heights.push((ThumbTip, UP));
        assert_eq!(classify_heights(&heights), Ok(Gesture::Like));
    }

    #[test]
    fn unknown() {
        assert_eq!(classify_heights(&fingers(UP, DOWN, UP, DOWN)), Ok(Gesture::Unknown));

        // Thumb level with the knuckle is neither above nor below.
        let mut heights = fingers(DOWN, DOWN, UP, DOWN);
        heights.push((ThumbTip, MCP));
        assert_eq!(classify_heights(&heights), Ok(Gesture::Unknown));
    }

    #[test]
    fn flat_hand_is_unknown() {
        // All landmarks at the same height: every comparison is strict, so nothing matches.
        assert_eq!(classify_heights(&[]), Ok(Gesture::Unknown));
    }

    #[test]
    fn wrong_landmark_count() {
        let hand = hand_with_heights(&[]);
        assert_eq!(
            classify(&hand.as_slice()[..20]),
            Err(ClassifyError::LandmarkCount(20))
        );
        assert_eq!(classify(&[]), Err(ClassifyError::LandmarkCount(0)));
    }

    #[test]
    fn non_finite_coordinates() {
        assert_eq!(
            classify_heights(&[(PinkyTip, f32::NAN)]),
            Err(ClassifyError::NonFinite(PinkyTip))
        );
        assert_eq!(
            classify_heights(&[(IndexFingerMcp, f32::INFINITY)]),
            Err(ClassifyError::NonFinite(IndexFingerMcp))
        );
    }

    #[test]
    fn unused_landmarks_are_ignored() {
        // Non-finite values in landmarks the rules do not look at do not matter.
        let mut heights = fingers(DOWN, DOWN, DOWN, DOWN);
        heights.push((Wrist, f32::NAN));
        assert_eq!(classify_heights(&heights), Ok(Gesture::Fist));
    }

    /// Straightforward restatement of the classification rules, checked in priority order.
    fn expected_gesture(landmarks: &[Landmark]) -> Gesture {
        let mcp = landmarks[IndexFingerMcp as usize].y();
        let up = |idx: LandmarkIdx| landmarks[idx as usize].y() < mcp;
        let down = |idx: LandmarkIdx| landmarks[idx as usize].y() > mcp;

        if down(IndexFingerTip) && down(MiddleFingerTip) && down(RingFingerTip) && down(PinkyTip) {
            Gesture::Fist
        } else if up(IndexFingerTip) && up(MiddleFingerTip) && up(RingFingerTip) && up(PinkyTip) {
            Gesture::OpenPalm
        } else if up(IndexFingerTip)
            && up(MiddleFingerTip)
            && down(RingFingerTip)
            && down(PinkyTip)
        {
            Gesture::PeaceSign
        } else if up(ThumbTip) && down(IndexFingerTip) && down(MiddleFingerTip) {
            Gesture::Like
        } else {
            Gesture::Unknown
        }
    }

    #[test]
    fn random_hands() {
        // Coordinates are often snapped to a few shared heights so that ties come up.
        const LEVELS: [f32; 3] = [UP, MCP, DOWN];

        let mut rng = fastrand::Rng::with_seed(0x5eed);
        for _ in 0..2000 {
            let len = if rng.u8(0..4) != 0 { NUM_LANDMARKS } else { rng.usize(0..40) };
            let landmarks: Vec<_> = (0..len)
                .map(|_| {
                    let mut coord = || match rng.u8(0..60) {
                        0 => f32::NAN,
                        1 => f32::NEG_INFINITY,
                        2..=29 => LEVELS[rng.usize(..LEVELS.len())],
                        _ => rng.f32() * 2.0 - 0.5,
                    };
                    Landmark::new([coord(), coord(), coord()])
                })
                .collect();

            match classify(&landmarks) {
                Ok(gesture) => {
                    assert_eq!(len, NUM_LANDMARKS);
                    assert_eq!(gesture, expected_gesture(&landmarks), "{landmarks:?}");
                }
                Err(ClassifyError::LandmarkCount(n)) => assert_eq!(n, len),
                Err(ClassifyError::NonFinite(idx)) => {
                    assert!(!landmarks[idx as usize].is_finite())
                }
            }
        }
    }

    #[test]
    fn results() {
        let like = GestureResult::recognized(Gesture::Like);
        assert_eq!(like.label(), "Like");
        assert_eq!(like.confidence(), 1.0);
        assert_eq!(like.gesture(), Some(Gesture::Like));

        let unknown = GestureResult::recognized(Gesture::Unknown);
        assert_eq!(unknown.label(), "Unknown Gesture");
        assert_eq!(unknown.confidence(), 1.0);

        let none = GestureResult::no_hand();
        assert_eq!(none.label(), "No Gesture");
        assert_eq!(none.confidence(), 0.0);
        assert_eq!(none.gesture(), None);

        let error = GestureResult::from(classify(&[]));
        assert_eq!(error, GestureResult::error());
        assert_eq!(error.label(), "Error");
        assert_eq!(error.confidence(), 0.0);
    }

    #[test]
    fn serialize_result() {
        let json = serde_json::to_value(GestureResult::recognized(Gesture::OpenPalm)).unwrap();
        assert_eq!(json, serde_json::json!({"gesture": "Open Palm", "confidence": 1.0}));

        let json = serde_json::to_value(GestureResult::no_hand()).unwrap();
        assert_eq!(json, serde_json::json!({"gesture": "No Gesture", "confidence": 0.0}));
    }

    #[test]
    fn labels() {
        let labels = [
            Gesture::Fist,
            Gesture::OpenPalm,
            Gesture::PeaceSign,
            Gesture::Like,
            Gesture::Unknown,
        ]
        .map(|g| g.to_string());
        assert_eq!(labels, ["Fist", "Open Palm", "Peace Sign", "Like", "Unknown Gesture"]);
    }
}
