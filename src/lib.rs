pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod scraper;
pub mod screenshot;
pub mod validator;

use std::sync::Arc;
use config::Config;
use error::Result;
use llm::{LegitimacyClassifier, OpenAiClassifier};
use screenshot::{
    browser::BrowserOptions, HeadlessBrowserProvider, ScreenshotAcquirer, ScreenshotApiProvider,
    ScreenshotProvider,
};

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub classifier: Arc<dyn LegitimacyClassifier>,
    pub acquirer: Arc<ScreenshotAcquirer>,
}

impl AppState {
    /// Production wiring: OpenAI-compatible classifier, hosted screenshot
    /// API first, headless browser second.
    pub fn from_config(config: Config) -> Result<Self> {
        let classifier = OpenAiClassifier::new(&config)?;
        let providers: Vec<Arc<dyn ScreenshotProvider>> = vec![
            Arc::new(ScreenshotApiProvider::new(&config)?),
            Arc::new(HeadlessBrowserProvider::new(BrowserOptions::from_config(&config))),
        ];

        Ok(Self {
            classifier: Arc::new(classifier),
            acquirer: Arc::new(ScreenshotAcquirer::new(providers)?),
            config: Arc::new(config),
        })
    }
}
