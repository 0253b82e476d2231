use reqwest::{Client, ClientBuilder, Response};
use scraper::{ElementRef, Html, Node, Selector};
use std::time::Duration;
use once_cell::sync::Lazy;
use tracing::debug;
use url::Url;
use crate::error::{AppError, Result};

const EXCERPT_LIMIT: usize = 2000;

// The excerpt comes from the start of <body>, so a prefix of the page is enough
const MAX_PAGE_BYTES: usize = 256 * 1024;

// Text under these never reaches the excerpt
const SKIPPED_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

// Elements that separate words when their text is joined
const BLOCK_ELEMENTS: [&str; 28] = [
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol",
    "p", "pre", "section", "td", "tr",
];

// Create a static client to reuse connections
static CLIENT: Lazy<Client> = Lazy::new(|| {
    ClientBuilder::new()
        .timeout(Duration::from_secs(10))
        .connect_timeout(Duration::from_secs(5))
        .pool_max_idle_per_host(10)
        .build()
        .expect("Failed to build HTTP client")
});

// Create static selectors to avoid recompiling them each time
static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("body").expect("Failed to parse body selector")
});

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("title").expect("Failed to parse title selector")
});

/// What the classifier gets to see of a page besides its URL.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSummary {
    pub title: Option<String>,
    pub excerpt: String,
}

pub async fn fetch_page_summary(url: &Url) -> Result<PageSummary> {
    let html = fetch_html(url, MAX_PAGE_BYTES).await?;
    Ok(summarize_html(&html))
}

async fn fetch_html(url: &Url, limit: usize) -> Result<String> {
    let response = CLIENT
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| AppError::ClassifierUnavailable(format!("Failed to fetch page: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::ClassifierUnavailable(format!(
            "Failed to fetch page: HTTP {}",
            response.status()
        )));
    }

    let body = read_capped(response, limit).await?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Reads at most `limit` bytes of the body and drops the rest of the stream.
async fn read_capped(mut response: Response, limit: usize) -> Result<Vec<u8>> {
    let declared = response.content_length();
    if let Some(len) = declared.filter(|len| *len > limit as u64) {
        debug!(declared = len, limit, "Page larger than read limit, keeping a prefix");
    }

    let capacity = declared.map_or(limit, |len| (len as usize).min(limit));
    let mut body = Vec::with_capacity(capacity);
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| AppError::ClassifierUnavailable(format!("Failed to read page: {}", e)))?
    {
        let remaining = limit - body.len();
        if chunk.len() >= remaining {
            body.extend_from_slice(&chunk[..remaining]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

pub fn summarize_html(html: &str) -> PageSummary {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(visible_text)
        .filter(|title| !title.is_empty());

    let excerpt = document
        .select(&BODY_SELECTOR)
        .next()
        .map(visible_text)
        .map(|text| truncate_chars(&text, EXCERPT_LIMIT))
        .unwrap_or_default();

    PageSummary { title, excerpt }
}

fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_text(element, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if SKIPPED_ELEMENTS.contains(&el.name()) => {}
            Node::Element(el) => {
                let block = BLOCK_ELEMENTS.contains(&el.name());
                if let Some(child_element) = ElementRef::wrap(child) {
                    if block {
                        out.push(' ');
                    }
                    push_text(child_element, out);
                    if block {
                        out.push(' ');
                    }
                }
            }
            _ => {}
        }
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
