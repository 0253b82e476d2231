use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    #[serde(default)]
    pub url: Option<String>,
}

/// The model's judgment. `is_legitimate: None` serializes as `null`, meaning
/// unknown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegitimacyVerdict {
    pub is_legitimate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl LegitimacyVerdict {
    pub fn unknown() -> Self {
        Self {
            is_legitimate: None,
            rationale: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotSource {
    Primary,
    Fallback,
}

impl std::fmt::Display for ScreenshotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScreenshotSource::Primary => f.write_str("primary"),
            ScreenshotSource::Fallback => f.write_str("fallback"),
        }
    }
}

/// Either `image_data` or `error` is set, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotResult {
    pub source: ScreenshotSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScreenshotResult {
    pub fn captured(source: ScreenshotSource, image_data: String, mime_type: String) -> Self {
        Self {
            source,
            image_data: Some(image_data),
            mime_type: Some(mime_type),
            error: None,
        }
    }

    pub fn failed(source: ScreenshotSource, error: String) -> Self {
        Self {
            source,
            image_data: None,
            mime_type: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub url: String,
    pub valid: bool,
    pub verdict: Option<LegitimacyVerdict>,
    pub screenshot: Option<ScreenshotResult>,
    pub errors: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
