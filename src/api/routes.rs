use axum::{
    routing::{get, post},
    Router,
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::models::{ApiResponse, CheckRequest, HealthResponse};
use crate::api::response;
use crate::error::AppError;
use crate::llm::classify_with_timeout;
use crate::validator::validate_url;
use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/check-website", post(check_website_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn check_website_handler(
    State(state): State<AppState>,
    payload: Result<Json<CheckRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            return AppError::InvalidRequest(rejection.body_text()).into_response();
        }
    };

    let raw_url = match req.url {
        Some(url) if !url.trim().is_empty() => url,
        _ => return AppError::InvalidRequest("Please provide a URL".to_string()).into_response(),
    };

    let start_time = std::time::Instant::now();
    let (status, body) = check_website(&state, &raw_url).await;
    info!(
        url = %body.url,
        valid = body.valid,
        errors = body.errors.len(),
        elapsed = ?start_time.elapsed(),
        "Website check finished"
    );

    (status, Json(body)).into_response()
}

/// Validates, then runs the classifier and the screenshot chain side by side.
pub async fn check_website(state: &AppState, raw_url: &str) -> (StatusCode, ApiResponse) {
    let url = match validate_url(raw_url) {
        Ok(url) => url,
        Err(err) => {
            info!(url = %raw_url, error = %err, "Rejected URL");
            return (err.status_code(), response::rejected(raw_url, &err));
        }
    };

    let ((verdict, classifier_error), screenshot) = tokio::join!(
        classify_with_timeout(state.classifier.as_ref(), &url, state.config.classifier_timeout),
        state.acquirer.acquire(&url),
    );

    (StatusCode::OK, response::compose(&url, verdict, classifier_error, screenshot))
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}
