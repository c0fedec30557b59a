#![allow(dead_code)]

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures produced by the grid layout engine and its persistence bridge.
///
/// These never cross the controller boundary as panics: the controller
/// captures load failures into its own state and the debounced saver records
/// save failures in its last-error slot. Handlers translate the rest into
/// `AppError`.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// No free slot exists for the requested placement. Non-fatal: the
    /// triggering operation is a no-op and the layout is unchanged.
    #[error("No free slot available on the grid")]
    CapacityExceeded,

    #[error("Failed to load layout: {0}")]
    LoadFailed(String),

    #[error("Failed to save layout: {0}")]
    SaveFailed(String),

    /// A persisted record's `content` blob does not match its `item_type`.
    /// Fails the whole load — no partial-layout recovery.
    #[error("Malformed content for item '{item_key}': {reason}")]
    MalformedContent { item_key: String, reason: String },
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Layout(err) => match err {
                LayoutError::CapacityExceeded => {
                    (StatusCode::CONFLICT, "CAPACITY_EXCEEDED", err.to_string())
                }
                LayoutError::LoadFailed(_) | LayoutError::SaveFailed(_) => {
                    tracing::error!("Persistence error: {err}");
                    (
                        StatusCode::BAD_GATEWAY,
                        "PERSISTENCE_ERROR",
                        "A persistence error occurred".to_string(),
                    )
                }
                LayoutError::MalformedContent { .. } => {
                    tracing::error!("Malformed stored content: {err}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "MALFORMED_CONTENT",
                        "Stored layout content could not be parsed".to_string(),
                    )
                }
            },
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
