//! Gesture recognition HTTP service.
//!
//! Serves a webcam page at `/` and recognizes hand gestures in images posted to `/predict`.

mod config;
mod error;
mod routes;
mod server;

use std::sync::Arc;

use anyhow::Context;
use handsign::{hand::HandLandmarker, predict::Predictor};

use crate::{
    config::Config,
    routes::{create_router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    handsign::init_logger!();

    let config = Config::from_env()?;
    log::debug!("{:?}", config);

    let mut landmarker = HandLandmarker::load(&config.model_dir).with_context(|| {
        format!(
            "failed to load models (set {} to the directory containing them)",
            config::MODEL_DIR_VAR
        )
    })?;
    landmarker.palm_detector_mut().set_threshold(config.threshold);
    log::info!("hand models loaded from '{}'", config.model_dir.display());

    let predictor = Predictor::new(Arc::new(landmarker));
    let app = create_router(AppState::new(predictor));
    server::run_server(config.addr, app).await?;

    Ok(())
}
