//! Hand gesture recognition from still images.
//!
//! The pipeline has three stages:
//!
//! 1. An encoded image (usually a `data:` URL sent by a browser) is decoded into an [`Image`].
//! 2. A [`HandDetector`] locates a single hand and estimates its 21 [`HandLandmarks`].
//! 3. The landmarks are classified into a [`Gesture`] by comparing fingertip heights.
//!
//! [`Predictor`] runs all three stages and produces a [`GestureResult`].
//!
//! # Coordinates
//!
//! Landmark coordinates use the image coordinate system: X points to the right, Y points *down*,
//! and the origin is the top left corner of the image. Landmarks returned by a [`HandDetector`]
//! are normalized to the range `[0, 1]` by dividing by the image width and height.
//!
//! [`Image`]: image::Image
//! [`HandDetector`]: predict::HandDetector
//! [`HandLandmarks`]: hand::landmark::HandLandmarks
//! [`Gesture`]: gesture::Gesture
//! [`GestureResult`]: gesture::GestureResult
//! [`Predictor`]: predict::Predictor

use log::LevelFilter;

pub mod detection;
pub mod gesture;
pub mod hand;
pub mod image;
pub mod iter;
pub mod landmark;
pub mod nn;
pub mod num;
pub mod predict;
pub mod rect;
pub mod resolution;
pub mod timer;

#[cfg(test)]
mod test;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .filter(Some("tract_core"), LevelFilter::Warn)
        .filter(Some("tract_onnx"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and `handsign` will log at *trace*
/// level. Otherwise, they will log at *debug* level.
///
/// `tract` will always log at *warn* level. `RUST_LOG` can override all of this.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
