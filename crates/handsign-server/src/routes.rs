//! API route definitions

use std::any::Any;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use handsign::{gesture::GestureResult, predict::Predictor};
use serde_json::Value;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
};

use crate::error::ApiError;

/// Embedded webcam page
const INDEX_HTML: &str = include_str!("index.html");

/// State shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    predictor: Predictor,
}

impl AppState {
    pub fn new(predictor: Predictor) -> Self {
        Self { predictor }
    }
}

/// Create the router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(|| async { Html(INDEX_HTML) }))
        .route("/predict", post(predict))
        .with_state(state);

    with_layers(router)
}

/// Adds panic recovery, permissive CORS and an unlimited request body size to `router`.
fn with_layers(router: Router) -> Router {
    // The page may be served from elsewhere during development
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    // Webcam frames are sent as base64 data URLs and easily exceed axum's 2 MB default
    router
        .layer(DefaultBodyLimit::disable())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let msg = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("<non-string payload>");
    log::error!("request handler panicked: {msg}");
    ApiError::Internal.into_response()
}

/// `POST /predict` with a `{"image": "<data URL>"}` body.
///
/// The body is parsed by hand instead of with the `Json` extractor so that every malformed
/// request produces one of the [`ApiError`] bodies.
async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GestureResult>, ApiError> {
    let request: Value = serde_json::from_slice(&body).map_err(|e| {
        log::error!("invalid request body: {e}");
        ApiError::Internal
    })?;
    let image = image_field(&request)?;
    let Some(image) = image.as_str() else {
        log::error!("`image` is not a string: {image}");
        return Err(ApiError::ProcessingFailed);
    };

    let image = image.to_owned();
    let predictor = state.predictor.clone();
    let result = tokio::task::spawn_blocking(move || predictor.predict(&image))
        .await
        .map_err(|e| {
            log::error!("prediction task failed: {e}");
            ApiError::Internal
        })?;

    match result {
        Ok(result) => {
            log::debug!("prediction: {result}");
            Ok(Json(result))
        }
        Err(e) => {
            log::error!("an error occurred during prediction: {e}");
            Err(ApiError::ProcessingFailed)
        }
    }
}

/// Looks up the `image` member of a request body.
///
/// Only objects can carry an image. Arrays and strings that do not mention `image` are treated
/// like an object without the member; any other body is an internal error.
fn image_field(request: &Value) -> Result<&Value, ApiError> {
    let mentions_image = match request {
        Value::Object(map) => return map.get("image").ok_or(ApiError::NoImage),
        Value::Array(items) => items.iter().any(|item| item == "image"),
        Value::String(s) => s.contains("image"),
        Value::Null | Value::Bool(_) | Value::Number(_) => true,
    };
    if mentions_image {
        log::error!("request body is not a JSON object: {request}");
        Err(ApiError::Internal)
    } else {
        Err(ApiError::NoImage)
    }
}
