//! HTTP error envelope

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use core_pipeline::PipelineError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    /// The request was malformed before any processing happened
    BadRequest(String),
    /// The recognition pipeline failed
    Pipeline(PipelineError),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::Pipeline(err)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Pipeline(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            AppError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Pipeline(err) => err.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(%status, "{}", detail);
        } else {
            tracing::warn!(%status, "{}", detail);
        }

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
