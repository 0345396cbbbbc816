//! Application state and router.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use scrapechat_client::{ChatModel, FetchClient, FetchConfig, GroqClient, GroqConfig, Scraper};
use scrapechat_core::{AppConfig, Error, RateLimiter, ScrapeCache, SlidingWindowLimiter, SqliteStore};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::{chat, gate};

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub scraper: Scraper,
    pub chat: Arc<dyn ChatModel>,
    pub limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    /// Wire the store, scraper, LLM client and limiter described by `config`.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let mut scraper = Scraper::new(FetchClient::new(FetchConfig::from(config))?);

        if config.cache_enabled {
            let store = SqliteStore::open(&config.db_path).await?;
            match store.purge_expired().await {
                Ok(purged) => tracing::info!(purged, "purged expired cache entries"),
                Err(e) => tracing::warn!(error = %e, "failed to purge expired cache entries"),
            }
            let cache = ScrapeCache::new(Arc::new(store))
                .with_ttl(config.cache_ttl())
                .with_max_bytes(config.cache_max_bytes);
            scraper = scraper.with_cache(cache);
        } else {
            tracing::info!("scrape cache disabled");
        }

        let chat = GroqClient::new(GroqConfig::from_app(config)?)?;
        let limiter = SlidingWindowLimiter::new(config.rate_limit_requests, config.rate_limit_window());

        Ok(Self { scraper, chat: Arc::new(chat), limiter: Arc::new(limiter) })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat::handle_chat))
        .layer(middleware::from_fn_with_state(state.clone(), gate::rate_limit))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use scrapechat_client::{ChatMessage, GroqError, Role};
    use scrapechat_core::RateLimitDecision;
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Records every conversation it is asked to complete.
    #[derive(Default)]
    struct RecordingModel {
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl ChatModel for RecordingModel {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, GroqError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            Ok("Cats purr.".into())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, GroqError> {
            Err(GroqError::HttpError { status: 500 })
        }
    }

    struct BrokenLimiter;

    #[async_trait]
    impl RateLimiter for BrokenLimiter {
        async fn limit(&self, _key: &str) -> Result<RateLimitDecision, Error> {
            Err(Error::RateLimiter("store unreachable".into()))
        }
    }

    fn state(chat: Arc<dyn ChatModel>, limiter: Arc<dyn RateLimiter>) -> AppState {
        let scraper = Scraper::new(FetchClient::new(FetchConfig::default()).unwrap());
        AppState { scraper, chat, limiter }
    }

    fn default_state(chat: Arc<dyn ChatModel>) -> AppState {
        state(chat, Arc::new(SlidingWindowLimiter::new(4, Duration::from_secs(60))))
    }

    fn chat_request(body: &str, client: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .header("x-forwarded-for", client)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_chat_without_url() {
        let model = Arc::new(RecordingModel::default());
        let app = router(default_state(model.clone()));

        let body = r#"{"message":"  What is a cat?  ","messages":[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"}]}"#;
        let response = app.oneshot(chat_request(body, "10.0.0.1")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"message": "Cats purr."}));

        let calls = model.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let sent = &calls[0];
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0], ChatMessage::user("hi"));
        assert_eq!(sent[1], ChatMessage::assistant("hello"));
        assert_eq!(sent[2].role, Role::User);
        assert_eq!(sent[2].content, chat::build_prompt("What is a cat?", ""));
    }

    #[tokio::test]
    async fn test_chat_scrapes_linked_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cats"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><head><title>Cats</title></head><body><p>Cats eat fish.</p></body></html>",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let model = Arc::new(RecordingModel::default());
        let app = router(default_state(model.clone()));

        let url = format!("{}/cats", server.uri());
        let body = json!({ "message": format!("What does {url} say about cats? ") }).to_string();
        let response = app.oneshot(chat_request(&body, "10.0.0.2")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let calls = model.calls.lock().unwrap();
        let last = calls[0].last().unwrap();
        assert_eq!(
            last.content,
            "Answer my question : \"What does  say about cats?\"\n\nBased on the following content : \
             <content> Cats Cats eat fish. </content>"
        );
    }

    #[tokio::test]
    async fn test_chat_unreachable_url_still_answers() {
        let model = Arc::new(RecordingModel::default());
        let app = router(default_state(model.clone()));

        let body = r#"{"message":"summarize http://127.0.0.1:9/gone please"}"#;
        let response = app.oneshot(chat_request(body, "10.0.0.3")).await.unwrap();

        assert_eq!(json_body(response).await, json!({"message": "Cats purr."}));
        let calls = model.calls.lock().unwrap();
        assert!(calls[0].last().unwrap().content.ends_with("<content>  </content>"));
    }

    #[tokio::test]
    async fn test_chat_body_read_regardless_of_content_type() {
        let model = Arc::new(RecordingModel::default());
        let state = default_state(model.clone());

        let untyped = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("x-forwarded-for", "10.0.0.7")
            .body(Body::from(r#"{"message":"hi"}"#))
            .unwrap();
        let response = router(state.clone()).oneshot(untyped).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"message": "Cats purr."}));

        let plain = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "text/plain;charset=UTF-8")
            .header("x-forwarded-for", "10.0.0.7")
            .body(Body::from(r#"{"message":"hello"}"#))
            .unwrap();
        let response = router(state).oneshot(plain).await.unwrap();
        assert_eq!(json_body(response).await, json!({"message": "Cats purr."}));

        assert_eq!(model.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_chat_model_failure_replies_error() {
        let app = router(default_state(Arc::new(FailingModel)));
        let response = app.oneshot(chat_request(r#"{"message":"hi"}"#, "10.0.0.4")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"message": "Error"}));
    }

    #[tokio::test]
    async fn test_chat_malformed_body_replies_error() {
        let model = Arc::new(RecordingModel::default());
        let app = router(default_state(model.clone()));
        let response = app.oneshot(chat_request("{not json", "10.0.0.5")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"message": "Error"}));
        assert!(model.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fifth_request_rejected() {
        let model = Arc::new(RecordingModel::default());
        let state = default_state(model.clone());

        for expected_remaining in ["3", "2", "1", "0"] {
            let response =
                router(state.clone()).oneshot(chat_request(r#"{"message":"hi"}"#, "10.1.1.1")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()["x-ratelimit-limit"], "4");
            assert_eq!(response.headers()["x-ratelimit-remaining"], expected_remaining);
            assert!(response.headers().contains_key("x-ratelimit-reset"));
        }

        let response =
            router(state.clone()).oneshot(chat_request(r#"{"message":"hi"}"#, "10.1.1.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["x-ratelimit-limit"], "4");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
        assert_eq!(json_body(response).await, json!({"error": "Too Many Requests"}));
        assert_eq!(model.calls.lock().unwrap().len(), 4);

        let other = router(state).oneshot(chat_request(r#"{"message":"hi"}"#, "10.2.2.2")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_limiter_failure_is_500_without_headers() {
        let model = Arc::new(RecordingModel::default());
        let app = router(state(model.clone(), Arc::new(BrokenLimiter)));

        let response = app.oneshot(chat_request(r#"{"message":"hi"}"#, "10.0.0.6")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!response.headers().contains_key("x-ratelimit-limit"));
        assert!(!response.headers().contains_key("x-ratelimit-remaining"));
        assert_eq!(json_body(response).await, json!({"error": "Internal Server Error"}));
        assert!(model.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_health_bypasses_gate() {
        let app_state = state(Arc::new(RecordingModel::default()), Arc::new(BrokenLimiter));

        let response = router(app_state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("x-ratelimit-limit"));
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_state_from_config_requires_api_key() {
        let config = AppConfig { cache_enabled: false, ..Default::default() };
        let result = AppState::from_config(&config).await;
        assert!(matches!(result, Err(Error::Llm(_))));
    }

    #[tokio::test]
    async fn test_state_from_config() {
        let config = AppConfig {
            cache_enabled: false,
            groq_api_key: Some("test-key".into()),
            ..Default::default()
        };
        assert!(AppState::from_config(&config).await.is_ok());
    }
}
