//! Server configuration.

use std::{
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use anyhow::Context;
use handsign::hand::detection::PalmDetector;

/// Environment variable that overrides [`Config::model_dir`].
pub const MODEL_DIR_VAR: &str = "HANDSIGN_MODEL_DIR";
/// Environment variable that overrides [`Config::threshold`].
pub const THRESHOLD_VAR: &str = "HANDSIGN_THRESHOLD";

const DEFAULT_MODEL_DIR: &str = "3rdparty/onnx";
const PORT: u16 = 5000;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Address the HTTP server listens on. Always `0.0.0.0:5000`.
    pub addr: SocketAddr,
    /// Directory containing `palm_detection_full.onnx` and `hand_landmark_full.onnx`.
    pub model_dir: PathBuf,
    /// Minimum palm detection confidence for a hand to be reported.
    pub threshold: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, PORT)),
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            threshold: PalmDetector::DEFAULT_THRESHOLD,
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from the defaults and the variables returned by `var`.
    ///
    /// Returns an error if a variable is set to an invalid value.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(dir) = var(MODEL_DIR_VAR) {
            config.model_dir = PathBuf::from(dir);
        }

        if let Some(raw) = var(THRESHOLD_VAR) {
            let threshold: f32 = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid value for {THRESHOLD_VAR}: '{raw}'"))?;
            if !(0.0..=1.0).contains(&threshold) {
                anyhow::bail!("{THRESHOLD_VAR} must be between 0.0 and 1.0, got {threshold}");
            }
            config.threshold = threshold;
        }

        Ok(config)
    }
}
