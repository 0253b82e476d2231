use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

const SCREENSHOT_KEY_PLACEHOLDER: &str = "your_screenshotapi_key_here";

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub classifier_timeout: Duration,
    pub classifier_fetch_content: bool,
    pub screenshot_api_key: String,
    pub screenshot_api_url: String,
    pub screenshot_timeout: Duration,
    pub screenshot_width: u32,
    pub screenshot_height: u32,
    pub browser_timeout: Duration,
    pub chrome_path: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests never touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let openai_api_key = required(&lookup, "OPENAI_API_KEY")?;
        let screenshot_api_key = required(&lookup, "SCREENSHOTAPI_KEY")?;
        if screenshot_api_key == SCREENSHOT_KEY_PLACEHOLDER {
            return Err(AppError::Config(
                "SCREENSHOTAPI_KEY still holds the placeholder value".to_string(),
            ));
        }

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port: u16 = parsed(&lookup, "PORT", 5001)?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::Config(format!("Invalid host address: {}", e)))?;

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            openai_api_key,
            openai_base_url: lookup("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            openai_model: lookup("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            classifier_timeout: timeout_secs(&lookup, "CLASSIFIER_TIMEOUT_SECS", 30)?,
            classifier_fetch_content: flag(&lookup, "CLASSIFIER_FETCH_CONTENT", false)?,
            screenshot_api_key,
            screenshot_api_url: lookup("SCREENSHOT_API_URL")
                .unwrap_or_else(|| "https://api.screenshotapi.net/screenshot".to_string()),
            screenshot_timeout: timeout_secs(&lookup, "SCREENSHOT_TIMEOUT_SECS", 30)?,
            screenshot_width: parsed(&lookup, "SCREENSHOT_WIDTH", 1280)?,
            screenshot_height: parsed(&lookup, "SCREENSHOT_HEIGHT", 720)?,
            browser_timeout: timeout_secs(&lookup, "BROWSER_TIMEOUT_SECS", 45)?,
            chrome_path: lookup("CHROME_PATH").filter(|p| !p.trim().is_empty()),
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(AppError::Config(format!("{} is not set", key))),
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::Config(format!("Invalid {}: {}", key, e))),
        None => Ok(default),
    }
}

fn timeout_secs<F>(lookup: &F, key: &str, default: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match parsed(lookup, key, default)? {
        0 => Err(AppError::Config(format!("Invalid {}: must be at least 1 second", key))),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn flag<F>(lookup: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(AppError::Config(format!("Invalid {}: {}", key, v))),
    }
}
