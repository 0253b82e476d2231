use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use tracing::debug;
use url::Url;

use super::{Screenshot, ScreenshotProvider};
use crate::api::models::ScreenshotSource;
use crate::config::Config;
use crate::error::{AppError, Result};

/// Hosted rendering service (screenshotapi.net query contract).
pub struct ScreenshotApiProvider {
    client: Client,
    endpoint: String,
    token: String,
    width: u32,
    height: u32,
    timeout: Duration,
}

impl ScreenshotApiProvider {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.screenshot_timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build screenshot HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.screenshot_api_url.clone(),
            token: config.screenshot_api_key.clone(),
            width: config.screenshot_width,
            height: config.screenshot_height,
            timeout: config.screenshot_timeout,
        })
    }
}

#[async_trait]
impl ScreenshotProvider for ScreenshotApiProvider {
    fn name(&self) -> &str {
        "screenshot-api"
    }

    fn source(&self) -> ScreenshotSource {
        ScreenshotSource::Primary
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn capture(&self, url: &Url) -> Result<Screenshot> {
        debug!(url = %url, endpoint = %self.endpoint, "Requesting screenshot from API");

        let width = self.width.to_string();
        let height = self.height.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("token", self.token.as_str()),
                ("url", url.as_str()),
                ("width", width.as_str()),
                ("height", height.as_str()),
                ("full_page", "false"),
                ("fresh", "true"),
            ])
            .send()
            .await
            .map_err(|e| AppError::ScreenshotUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if status != StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::ScreenshotUnavailable(format!(
                "HTTP {} - {}",
                status.as_u16(),
                excerpt(&text)
            )));
        }

        if !content_type.contains("image") {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::ScreenshotUnavailable(format!(
                "returned non-image content: {}",
                excerpt(&text)
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::ScreenshotUnavailable(format!("failed to read image: {}", e)))?;

        Ok(Screenshot {
            bytes: bytes.to_vec(),
            mime_type: content_type,
        })
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(200).collect()
}
