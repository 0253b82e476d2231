//! Screenshot acquisition: an ordered chain of providers, first success wins.
//!
//! The production chain is the hosted screenshot API, then a local headless
//! browser.

pub mod browser;
pub mod screenshot_api;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{info, warn};
use url::Url;

use crate::api::models::{ScreenshotResult, ScreenshotSource};
use crate::error::{AppError, Result};

pub use browser::HeadlessBrowserProvider;
pub use screenshot_api::ScreenshotApiProvider;

/// Raw image returned by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Screenshot {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[async_trait]
pub trait ScreenshotProvider: Send + Sync {
    /// Short label used in logs and error messages.
    fn name(&self) -> &str;

    fn source(&self) -> ScreenshotSource;

    /// Upper bound for a single capture by this provider.
    fn timeout(&self) -> Duration;

    async fn capture(&self, url: &Url) -> Result<Screenshot>;
}

pub struct ScreenshotAcquirer {
    providers: Vec<Arc<dyn ScreenshotProvider>>,
}

impl ScreenshotAcquirer {
    pub fn new(providers: Vec<Arc<dyn ScreenshotProvider>>) -> Result<Self> {
        if providers.is_empty() {
            return Err(AppError::Config("no screenshot providers configured".to_string()));
        }
        Ok(Self { providers })
    }

    /// Tries each provider in order. Never fails; when every provider does,
    /// the result carries the collected errors instead of image data.
    pub async fn acquire(&self, url: &Url) -> ScreenshotResult {
        let mut failures = Vec::with_capacity(self.providers.len());
        let mut last_source = ScreenshotSource::Primary;

        for provider in &self.providers {
            last_source = provider.source();
            let timeout = provider.timeout();

            let outcome = match tokio::time::timeout(timeout, provider.capture(url)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(AppError::ScreenshotUnavailable(format!(
                    "timed out after {:?}",
                    timeout
                ))),
            };

            match outcome {
                Ok(shot) if !shot.bytes.is_empty() => {
                    info!(
                        url = %url,
                        provider = provider.name(),
                        bytes = shot.bytes.len(),
                        "Screenshot captured"
                    );
                    return ScreenshotResult::captured(
                        provider.source(),
                        STANDARD.encode(&shot.bytes),
                        shot.mime_type,
                    );
                }
                Ok(_) => {
                    warn!(url = %url, provider = provider.name(), "Provider returned an empty image");
                    failures.push(format!("{}: empty image", provider.name()));
                }
                Err(e) => {
                    warn!(url = %url, provider = provider.name(), error = %e, "Screenshot provider failed");
                    failures.push(format!("{}: {}", provider.name(), strip_taxonomy(&e)));
                }
            }
        }

        let err = AppError::ScreenshotUnavailable(failures.join("; "));
        ScreenshotResult::failed(last_source, err.to_string())
    }
}

// Provider errors are nested inside one ScreenshotUnavailable message, so the
// inner prefix would only repeat it.
fn strip_taxonomy(err: &AppError) -> String {
    match err {
        AppError::ScreenshotUnavailable(msg) => msg.clone(),
        other => other.to_string(),
    }
}
