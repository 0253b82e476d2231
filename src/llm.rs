use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::api::models::LegitimacyVerdict;
use crate::config::Config;
use crate::error::{Result, AppError};
use crate::scraper::{fetch_page_summary, PageSummary};

const SYSTEM_PROMPT: &str = "You are an expert in website security and legitimacy analysis. \
Only respond with one of the two specified options.";

const LEGITIMATE_ANSWER: &str = "real and seems safe";
const NOT_LEGITIMATE_ANSWER: &str = "not real";

/// Asks some external judge whether a site is legitimate.
#[async_trait]
pub trait LegitimacyClassifier: Send + Sync {
    async fn classify(&self, url: &Url) -> Result<LegitimacyVerdict>;
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
}

/// Chat-completions client for OpenAI or any API-compatible endpoint.
pub struct OpenAiClassifier {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    fetch_content: bool,
}

impl OpenAiClassifier {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.classifier_timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build classifier HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.clone(),
            model: config.openai_model.clone(),
            fetch_content: config.classifier_fetch_content,
        })
    }

    async fn page_context(&self, url: &Url) -> Option<PageSummary> {
        if !self.fetch_content {
            return None;
        }
        match fetch_page_summary(url).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(url = %url, error = %e, "Page fetch failed, classifying on URL alone");
                None
            }
        }
    }
}

#[async_trait]
impl LegitimacyClassifier for OpenAiClassifier {
    async fn classify(&self, url: &Url) -> Result<LegitimacyVerdict> {
        let page = self.page_context(url).await;
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".into(),
                    content: SYSTEM_PROMPT.into(),
                },
                Message {
                    role: "user".into(),
                    content: build_prompt(url, page.as_ref()),
                },
            ],
            max_tokens: 50,
        };

        let res = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ClassifierUnavailable(format!("Request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(AppError::ClassifierUnavailable(format!(
                "HTTP {} - {}",
                status,
                excerpt(&text)
            )));
        }

        let json: serde_json::Value = res
            .json()
            .await
            .map_err(|e| AppError::ClassifierUnavailable(format!("Malformed response: {}", e)))?;
        let reply = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AppError::ClassifierUnavailable("Invalid response format from LLM".to_string()))?;

        debug!(url = %url, reply = %reply, "Classifier replied");
        Ok(parse_verdict(reply))
    }
}

/// Runs the classifier under a deadline. Any failure becomes an unknown
/// verdict plus an error entry for the response.
pub async fn classify_with_timeout(
    classifier: &dyn LegitimacyClassifier,
    url: &Url,
    timeout: Duration,
) -> (LegitimacyVerdict, Option<String>) {
    let err = match tokio::time::timeout(timeout, classifier.classify(url)).await {
        Ok(Ok(verdict)) => return (verdict, None),
        Ok(Err(e)) => e,
        Err(_) => AppError::ClassifierUnavailable(format!("timed out after {:?}", timeout)),
    };
    warn!(url = %url, error = %err, "Classifier unavailable, verdict is unknown");
    (LegitimacyVerdict::unknown(), Some(err.to_string()))
}

pub fn build_prompt(url: &Url, page: Option<&PageSummary>) -> String {
    let mut prompt = format!(
        "Analyze the following webpage URL to determine if the specific page is legitimate (real) and safe.\n\
URL: {url}\n\n\
Consider factors such as:\n\
- URL structure (e.g., misspellings, unusual subdomains or paths)\n\
- Domain reputation (e.g., well-known sites like udemy.com are generally safe)\n\
- Signs of phishing or scam pages\n"
    );

    if let Some(page) = page {
        prompt.push_str("\nPage content retrieved from the URL:\n");
        if let Some(title) = &page.title {
            prompt.push_str("Title: ");
            prompt.push_str(title);
            prompt.push('\n');
        }
        prompt.push_str("Text: ");
        prompt.push_str(&page.excerpt);
        prompt.push('\n');
    }

    prompt.push_str(
        "\nRespond with exactly one of these two options:\n\
- \"The webpage URL is real and seems safe\" if the page is legitimate and safe.\n\
- \"The webpage URL is not real\" if the page shows signs of being fake, suspicious, or is inaccessible.\n",
    );
    prompt
}

/// Maps the model's answer onto a verdict. Anything outside the two agreed
/// phrases is unknown.
pub fn parse_verdict(reply: &str) -> LegitimacyVerdict {
    let reply = reply.trim();
    let lower = reply.to_lowercase();
    let is_legitimate = if lower.contains(LEGITIMATE_ANSWER) {
        Some(true)
    } else if lower.contains(NOT_LEGITIMATE_ANSWER) {
        Some(false)
    } else {
        None
    };

    LegitimacyVerdict {
        is_legitimate,
        rationale: (!reply.is_empty()).then(|| reply.to_string()),
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(200).collect()
}
