use axum::{
    response::{IntoResponse, Response},
    Json,
    http::StatusCode,
};

use crate::api::response;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("InvalidRequestError: {0}")]
    InvalidRequest(String),

    #[error("InvalidUrlError: {0}")]
    InvalidUrl(String),

    #[error("ClassifierUnavailableError: {0}")]
    ClassifierUnavailable(String),

    #[error("ScreenshotUnavailableError: {0}")]
    ScreenshotUnavailable(String),

    #[error("ConfigurationError: {0}")]
    Config(String),
}

impl AppError {
    /// Status used when the error ends a request. Classifier and screenshot
    /// failures never do; they are folded into the response body instead.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) | AppError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            AppError::ClassifierUnavailable(_) | AppError::ScreenshotUnavailable(_) => StatusCode::OK,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = response::rejected("", &self);
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
