use axum::{ http::StatusCode, response::{ IntoResponse, Response }, Json };
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Request body parse error: {0}")]
    Parse(String),

    #[error("Upstream request failed: {0}")]
    UpstreamRequest(#[source] reqwest::Error),

    #[error("Upstream returned status {status}: {body}")]
    UpstreamStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Upstream stream error: {0}")]
    UpstreamStream(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to build streaming response: {0}")]
    ResponseBuild(#[source] axum::http::Error),
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Parse(err.to_string())
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub message: &'static str,
}

pub const INTERNAL_SERVER_ERROR_MESSAGE: &str = "Internal Server Error";

/// Errors that reach the handler before any body byte is written. The caller
/// only ever sees the generic message; details stay in the log.
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody { message: INTERNAL_SERVER_ERROR_MESSAGE }),
        ).into_response()
    }
}
