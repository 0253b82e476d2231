use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use super::{Screenshot, ScreenshotProvider};
use crate::api::models::ScreenshotSource;
use crate::config::Config;
use crate::error::{AppError, Result};

/// Launch settings for one capture.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserOptions {
    pub width: u32,
    pub height: u32,
    pub timeout: Duration,
    pub chrome_path: Option<PathBuf>,
}

impl BrowserOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            width: config.screenshot_width,
            height: config.screenshot_height,
            timeout: config.browser_timeout,
            chrome_path: config.chrome_path.as_ref().map(PathBuf::from),
        }
    }

    fn browser_config(&self, profile_dir: &Path) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .window_size(self.width, self.height)
            .viewport(Viewport {
                width: self.width,
                height: self.height,
                ..Default::default()
            })
            .request_timeout(self.timeout)
            .user_data_dir(profile_dir);

        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }

        builder
            .build()
            .map_err(|e| AppError::ScreenshotUnavailable(format!("browser config: {}", e)))
    }
}

/// Local Chromium driven over CDP. Slow, but independent of the hosted API.
pub struct HeadlessBrowserProvider {
    options: BrowserOptions,
}

impl HeadlessBrowserProvider {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl ScreenshotProvider for HeadlessBrowserProvider {
    fn name(&self) -> &str {
        "headless-browser"
    }

    fn source(&self) -> ScreenshotSource {
        ScreenshotSource::Fallback
    }

    fn timeout(&self) -> Duration {
        self.options.timeout
    }

    async fn capture(&self, url: &Url) -> Result<Screenshot> {
        info!(url = %url, "Capturing screenshot with headless browser");
        let mut session = BrowserSession::launch(&self.options).await?;
        let result = session.screenshot(url).await;
        session.close().await;
        result
    }
}

/// Temporary Chromium profile, removed when dropped.
///
/// Created before the browser starts, so the directory goes away even when
/// the capture is abandoned in the middle of the launch.
struct ProfileDir {
    path: PathBuf,
}

impl ProfileDir {
    fn new() -> Self {
        Self {
            path: std::env::temp_dir().join(format!("site-check-chrome-{}", uuid::Uuid::new_v4())),
        }
    }
}

impl Drop for ProfileDir {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!(dir = %self.path.display(), error = %e, "Failed to remove browser profile dir");
            }
        }
    }
}

/// Owns one browser process for the duration of a capture.
///
/// `close` shuts the browser down gracefully. If the session is dropped
/// without it (timeout, cancellation), `Drop` stops the CDP handler,
/// chromiumoxide kills the child process when `Browser` drops, and the
/// profile dir guard removes the profile.
struct BrowserSession {
    browser: Option<Browser>,
    handler: JoinHandle<()>,
    profile_dir: ProfileDir,
}

impl BrowserSession {
    async fn launch(options: &BrowserOptions) -> Result<Self> {
        let profile_dir = ProfileDir::new();
        let config = options.browser_config(&profile_dir.path)?;

        // A failed or abandoned launch drops chromiumoxide's child handle,
        // which kills the process.
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::ScreenshotUnavailable(format!("browser launch failed: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        debug!(profile_dir = %profile_dir.path.display(), "Headless browser launched");
        Ok(Self {
            browser: Some(browser),
            handler,
            profile_dir,
        })
    }

    async fn screenshot(&mut self, url: &Url) -> Result<Screenshot> {
        let browser = self
            .browser
            .as_mut()
            .ok_or_else(|| AppError::ScreenshotUnavailable("browser already closed".to_string()))?;

        let page = browser
            .new_page(url.as_str())
            .await
            .map_err(|e| AppError::ScreenshotUnavailable(format!("navigation failed: {}", e)))?;

        page.wait_for_navigation()
            .await
            .map_err(|e| AppError::ScreenshotUnavailable(format!("page did not load: {}", e)))?;

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(false)
            .build();
        let bytes = page
            .screenshot(params)
            .await
            .map_err(|e| AppError::ScreenshotUnavailable(format!("capture failed: {}", e)))?;

        Ok(Screenshot {
            bytes,
            mime_type: "image/png".to_string(),
        })
    }

    async fn close(mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "Graceful browser close failed, killing process");
                if let Some(Err(e)) = browser.kill().await {
                    warn!(error = %e, "Failed to kill browser process");
                }
            }
            if let Err(e) = browser.wait().await {
                warn!(error = %e, "Failed to reap browser process");
            }
        }
        debug!(profile_dir = %self.profile_dir.path.display(), "Headless browser closed");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
