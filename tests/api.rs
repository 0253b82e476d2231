use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use url::Url;

use site_check::{
    api::models::{LegitimacyVerdict, ScreenshotSource},
    api::routes::create_router,
    config::Config,
    error::{AppError, Result},
    llm::LegitimacyClassifier,
    screenshot::{Screenshot, ScreenshotAcquirer, ScreenshotProvider},
    AppState,
};

enum Behavior {
    Answer(Option<bool>),
    Fail,
    Hang,
}

struct MockClassifier {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl MockClassifier {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LegitimacyClassifier for MockClassifier {
    async fn classify(&self, _url: &Url) -> Result<LegitimacyVerdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Answer(is_legitimate) => Ok(LegitimacyVerdict {
                is_legitimate,
                rationale: Some("The webpage URL is real and seems safe".to_string()),
            }),
            Behavior::Fail => Err(AppError::ClassifierUnavailable("HTTP 503".to_string())),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(LegitimacyVerdict::unknown())
            }
        }
    }
}

struct MockProvider {
    source: ScreenshotSource,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl MockProvider {
    fn new(source: ScreenshotSource, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            source,
            behavior,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ScreenshotProvider for MockProvider {
    fn name(&self) -> &str {
        match self.source {
            ScreenshotSource::Primary => "mock-primary",
            ScreenshotSource::Fallback => "mock-fallback",
        }
    }

    fn source(&self) -> ScreenshotSource {
        self.source
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(100)
    }

    async fn capture(&self, _url: &Url) -> Result<Screenshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Answer(_) => Ok(Screenshot {
                bytes: b"\x89PNG fake".to_vec(),
                mime_type: "image/png".to_string(),
            }),
            Behavior::Fail => Err(AppError::ScreenshotUnavailable("HTTP 500".to_string())),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(AppError::ScreenshotUnavailable("too late".to_string()))
            }
        }
    }
}

struct Harness {
    router: Router,
    classifier: Arc<MockClassifier>,
    primary: Arc<MockProvider>,
    fallback: Arc<MockProvider>,
}

fn harness(classifier: Behavior, primary: Behavior, fallback: Behavior) -> Harness {
    let config = Config::from_lookup(|key| match key {
        "OPENAI_API_KEY" => Some("sk-test".into()),
        "SCREENSHOTAPI_KEY" => Some("shot-test".into()),
        "CLASSIFIER_TIMEOUT_SECS" => Some("1".into()),
        _ => None,
    })
    .unwrap();

    let classifier = MockClassifier::new(classifier);
    let primary = MockProvider::new(ScreenshotSource::Primary, primary);
    let fallback = MockProvider::new(ScreenshotSource::Fallback, fallback);
    let providers: Vec<Arc<dyn ScreenshotProvider>> = vec![primary.clone(), fallback.clone()];

    let state = AppState {
        config: Arc::new(config),
        classifier: classifier.clone(),
        acquirer: Arc::new(ScreenshotAcquirer::new(providers).unwrap()),
    };

    Harness {
        router: create_router(state),
        classifier,
        primary,
        fallback,
    }
}

fn healthy() -> Harness {
    harness(Behavior::Answer(Some(true)), Behavior::Answer(None), Behavior::Answer(None))
}

async fn post_json(router: &Router, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/check-website")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn check(router: &Router, url: &str) -> (StatusCode, Value) {
    post_json(router, &json!({ "url": url }).to_string()).await
}

#[tokio::test]
async fn healthy_services_return_primary_screenshot_and_verdict() {
    let h = healthy();
    let (status, body) = check(&h.router, "https://example.com").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["url"], "https://example.com/");
    assert_eq!(body["verdict"]["isLegitimate"], true);
    assert!(body["verdict"]["rationale"].as_str().unwrap().contains("real"));
    assert_eq!(body["screenshot"]["source"], "primary");
    assert!(!body["screenshot"]["imageData"].as_str().unwrap().is_empty());
    assert!(body["screenshot"].get("error").is_none());
    assert_eq!(body["errors"], json!([]));
    assert_eq!(h.fallback.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_url_short_circuits_without_outbound_calls() {
    let h = healthy();
    let (status, body) = check(&h.router, "not a url").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["valid"], false);
    assert_eq!(body["verdict"], Value::Null);
    assert_eq!(body["screenshot"], Value::Null);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().starts_with("InvalidUrlError: "));

    assert_eq!(h.classifier.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.primary.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.fallback.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn other_unparseable_inputs_never_reach_the_services() {
    let h = healthy();
    for input in ["ftp://example.com", "https://", "http://nodots", "example.com"] {
        let (_, body) = check(&h.router, input).await;
        assert_eq!(body["valid"], false, "{} should be rejected", input);
    }
    assert_eq!(h.classifier.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.primary.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_url_is_a_bad_request() {
    let h = healthy();
    let (status, body) = post_json(&h.router, "{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["valid"], false);
    assert_eq!(body["errors"][0], "InvalidRequestError: Please provide a URL");

    let (status, body) = post_json(&h.router, "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"][0].as_str().unwrap().starts_with("InvalidRequestError: "));
    assert_eq!(h.classifier.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn primary_timeout_falls_back_to_browser() {
    let h = harness(Behavior::Answer(Some(true)), Behavior::Hang, Behavior::Answer(None));
    let (status, body) = check(&h.router, "https://example.com").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["screenshot"]["source"], "fallback");
    assert!(body["screenshot"]["imageData"].is_string());
    assert_eq!(body["errors"], json!([]));
    assert_eq!(h.fallback.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn both_screenshot_paths_failing_is_reported_not_fatal() {
    let h = harness(Behavior::Answer(Some(false)), Behavior::Fail, Behavior::Fail);
    let (status, body) = check(&h.router, "https://example.com").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["verdict"]["isLegitimate"], false);
    assert!(body["screenshot"].get("imageData").is_none());
    let error = body["screenshot"]["error"].as_str().unwrap();
    assert!(error.contains("mock-primary: HTTP 500"));
    assert!(error.contains("mock-fallback: HTTP 500"));
    assert_eq!(body["errors"], json!([error]));
}

#[tokio::test]
async fn classifier_timeout_degrades_to_unknown() {
    let h = harness(Behavior::Hang, Behavior::Answer(None), Behavior::Answer(None));
    let (status, body) = check(&h.router, "https://example.com").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["verdict"]["isLegitimate"], Value::Null);
    assert_eq!(body["screenshot"]["source"], "primary");
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().starts_with("ClassifierUnavailableError: "));
}

#[tokio::test]
async fn classifier_failure_degrades_to_unknown() {
    let h = harness(Behavior::Fail, Behavior::Answer(None), Behavior::Answer(None));
    let (status, body) = check(&h.router, "https://example.com").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verdict"], json!({ "isLegitimate": null }));
    assert_eq!(body["errors"], json!(["ClassifierUnavailableError: HTTP 503"]));
}

#[tokio::test]
async fn health_is_fixed_regardless_of_services() {
    let h = harness(Behavior::Fail, Behavior::Fail, Behavior::Fail);
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = h.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(h.classifier.calls.load(Ordering::SeqCst), 0);
}
