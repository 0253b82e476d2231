use chrono::Utc;
use url::Url;

use crate::api::models::{ApiResponse, LegitimacyVerdict, ScreenshotResult};
use crate::error::AppError;

/// Response for a request that never got past validation. Neither the
/// classifier nor a screenshot provider was consulted.
pub fn rejected(raw_url: &str, err: &AppError) -> ApiResponse {
    ApiResponse {
        url: raw_url.to_string(),
        valid: false,
        verdict: None,
        screenshot: None,
        errors: vec![err.to_string()],
        checked_at: Utc::now(),
    }
}

/// Merges the classifier and screenshot outcomes for a validated URL.
///
/// Errors keep a fixed order: classifier first, then screenshot. A
/// screenshot error only appears when every provider failed.
pub fn compose(
    url: &Url,
    verdict: LegitimacyVerdict,
    classifier_error: Option<String>,
    screenshot: ScreenshotResult,
) -> ApiResponse {
    let mut errors = Vec::new();
    if let Some(err) = classifier_error {
        errors.push(err);
    }
    if let Some(err) = &screenshot.error {
        errors.push(err.clone());
    }

    ApiResponse {
        url: url.to_string(),
        valid: true,
        verdict: Some(verdict),
        screenshot: Some(screenshot),
        errors,
        checked_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::ScreenshotSource;

    #[test]
    fn rejected_response_short_circuits() {
        let err = AppError::InvalidUrl("URL is empty".into());
        let response = rejected("", &err);
        assert!(!response.valid);
        assert!(response.verdict.is_none());
        assert!(response.screenshot.is_none());
        assert_eq!(response.errors, vec!["InvalidUrlError: URL is empty".to_string()]);
    }

    #[test]
    fn compose_orders_errors() {
        let url = Url::parse("https://example.com").unwrap();
        let response = compose(
            &url,
            LegitimacyVerdict::unknown(),
            Some("ClassifierUnavailableError: timed out".into()),
            ScreenshotResult::failed(ScreenshotSource::Fallback, "ScreenshotUnavailableError: all failed".into()),
        );
        assert!(response.valid);
        assert_eq!(response.url, "https://example.com/");
        assert_eq!(
            response.errors,
            vec![
                "ClassifierUnavailableError: timed out".to_string(),
                "ScreenshotUnavailableError: all failed".to_string(),
            ]
        );
    }

    #[test]
    fn compose_without_failures_has_no_errors() {
        let url = Url::parse("https://example.com").unwrap();
        let verdict = LegitimacyVerdict {
            is_legitimate: Some(true),
            rationale: Some("The webpage URL is real and seems safe".into()),
        };
        let screenshot = ScreenshotResult::captured(ScreenshotSource::Primary, "aGk=".into(), "image/png".into());
        let response = compose(&url, verdict.clone(), None, screenshot);
        assert!(response.errors.is_empty());
        assert_eq!(response.verdict, Some(verdict));
    }
}
