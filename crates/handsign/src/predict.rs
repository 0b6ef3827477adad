//! Request-level gesture prediction.

use std::sync::Arc;

use crate::{
    gesture::{classify, GestureResult},
    hand::landmark::HandLandmarks,
    image::{decode_data_url, DecodeError, Image},
};

/// Locates a single hand in an image and estimates its landmarks.
///
/// Implementations must not keep state between calls: every image is processed on its own, and a
/// detector may be used from many threads at once.
pub trait HandDetector: Send + Sync {
    /// Returns the landmarks of the most confident hand in `image`, or [`None`] if there is none.
    ///
    /// Landmark coordinates are normalized to `[0, 1]` by the image width and height.
    fn detect(&self, image: &Image) -> anyhow::Result<Option<HandLandmarks>>;
}

/// Errors that prevent a prediction from producing a [`GestureResult`].
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] DecodeError),
    #[error("hand detection failed: {0:#}")]
    Detection(anyhow::Error),
}

/// Runs the full pipeline (decode, detect and classify) for a single image.
#[derive(Clone)]
pub struct Predictor {
    detector: Arc<dyn HandDetector>,
}

impl Predictor {
    pub fn new(detector: Arc<dyn HandDetector>) -> Self {
        Self { detector }
    }

    /// Predicts the gesture shown in a `data:` URL encoded image.
    ///
    /// An image without a hand is not an error, it results in [`GestureResult::no_hand`].
    pub fn predict(&self, data_url: &str) -> Result<GestureResult, PredictError> {
        let image = decode_data_url(data_url)?;
        self.predict_image(&image)
    }

    /// Predicts the gesture shown in an already decoded image.
    pub fn predict_image(&self, image: &Image) -> Result<GestureResult, PredictError> {
        let hand = self
            .detector
            .detect(image)
            .map_err(PredictError::Detection)?;

        let result = match hand {
            Some(hand) => {
                log::debug!(
                    "found {:?} hand (presence {:.2})",
                    hand.handedness(),
                    hand.presence()
                );
                GestureResult::from(classify(hand.as_slice()))
            }
            None => GestureResult::no_hand(),
        };
        log::debug!("{:?}: {}", image, result);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::{
        gesture::Gesture,
        hand::landmark::LandmarkIdx,
        test::{hand_with_heights, png_data_url},
    };

    use super::*;

    /// Returns a fixed detection result and counts its invocations.
    struct FakeDetector {
        hand: Option<HandLandmarks>,
        calls: AtomicUsize,
    }

    impl FakeDetector {
        fn new(hand: Option<HandLandmarks>) -> Arc<Self> {
            Arc::new(Self {
                hand,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl HandDetector for FakeDetector {
        fn detect(&self, _image: &Image) -> anyhow::Result<Option<HandLandmarks>> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(self.hand.clone())
        }
    }

    struct FailingDetector;

    impl HandDetector for FailingDetector {
        fn detect(&self, _image: &Image) -> anyhow::Result<Option<HandLandmarks>> {
            anyhow::bail!("network exploded")
        }
    }

    fn open_palm() -> HandLandmarks {
        use LandmarkIdx::*;
        hand_with_heights(&[
            (IndexFingerMcp, 0.6),
            (IndexFingerTip, 0.2),
            (MiddleFingerTip, 0.1),
            (RingFingerTip, 0.2),
            (PinkyTip, 0.3),
        ])
    }

    #[test]
    fn predicts_gesture() {
        let detector = FakeDetector::new(Some(open_palm()));
        let predictor = Predictor::new(detector.clone());

        let result = predictor.predict(&png_data_url(&Image::new(8, 8))).unwrap();
        assert_eq!(result, GestureResult::recognized(Gesture::OpenPalm));
        assert_eq!(result.confidence(), 1.0);
        assert_eq!(detector.calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn no_hand() {
        let predictor = Predictor::new(FakeDetector::new(None));
        let result = predictor.predict(&png_data_url(&Image::new(8, 8))).unwrap();
        assert_eq!(result.label(), "No Gesture");
        assert_eq!(result.confidence(), 0.0);
    }

    #[test]
    fn decode_errors_skip_detection() {
        let detector = FakeDetector::new(Some(open_palm()));
        let predictor = Predictor::new(detector.clone());

        let err = predictor.predict("no comma here").unwrap_err();
        assert!(matches!(err, PredictError::Decode(DecodeError::MissingSeparator)), "{err}");
        assert_eq!(detector.calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn detection_errors() {
        let predictor = Predictor::new(Arc::new(FailingDetector));
        let err = predictor.predict(&png_data_url(&Image::new(8, 8))).unwrap_err();
        assert!(matches!(err, PredictError::Detection(_)));
        assert!(err.to_string().contains("network exploded"), "{err}");
    }
}
