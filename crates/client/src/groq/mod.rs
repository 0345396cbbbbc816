//! Groq chat-completions client.
//!
//! ### Contract
//!
//! - **Endpoint**: `POST {base_url}/chat/completions` (OpenAI-compatible).
//! - **Authentication**: `Authorization: Bearer <key>`.
//! - **Messages**: the configured system preamble is always sent first, followed
//!   by the caller's turns in order.
//! - **Result**: the first choice's message content as plain text.

pub mod error;
pub mod request;
pub mod response;

pub use error::GroqError;
pub use request::{ChatMessage, Role};

use async_trait::async_trait;
use reqwest::header;
use std::time::{Duration, Instant};

use request::CompletionRequest;
use response::CompletionResponse;
use scrapechat_core::AppConfig;

/// Default base URL for the Groq OpenAI-compatible API.
const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default model.
const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A model that turns a conversation into a single reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete the conversation `messages` (system preamble excluded).
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, GroqError>;
}

/// Groq client configuration.
#[derive(Debug, Clone)]
pub struct GroqConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Preamble sent as the first system turn of every request.
    pub system_prompt: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: scrapechat_core::config::DEFAULT_SYSTEM_PROMPT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: "scrapechat/0.1".to_string(),
        }
    }
}

impl GroqConfig {
    /// Build from application config. Fails when no API key is configured.
    pub fn from_app(config: &AppConfig) -> Result<Self, GroqError> {
        let api_key = config.require_groq_api_key().map_err(|_| GroqError::MissingApiKey)?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: config.groq_base_url.trim_end_matches('/').to_string(),
            model: config.groq_model.clone(),
            system_prompt: config.system_prompt.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
        })
    }
}

/// Groq chat-completions client.
#[derive(Debug, Clone)]
pub struct GroqClient {
    http: reqwest::Client,
    config: GroqConfig,
}

impl GroqClient {
    /// Create a new Groq client with the given configuration.
    pub fn new(config: GroqConfig) -> Result<Self, GroqError> {
        if config.api_key.trim().is_empty() {
            return Err(GroqError::MissingApiKey);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .use_rustls_tls()
            .build()?;

        Ok(Self { http, config })
    }

    /// Full message list sent upstream: preamble, then `messages`.
    fn with_preamble(&self, messages: &[ChatMessage]) -> Vec<ChatMessage> {
        std::iter::once(ChatMessage::system(self.config.system_prompt.as_str()))
            .chain(messages.iter().cloned())
            .collect()
    }
}

#[async_trait]
impl ChatModel for GroqClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, GroqError> {
        let start = Instant::now();
        let url = format!("{}/chat/completions", self.config.base_url);
        let messages = self.with_preamble(messages);
        let body = CompletionRequest { model: &self.config.model, messages: &messages };

        tracing::debug!(model = %self.config.model, turns = messages.len(), "starting Groq completion");

        let http_response = self
            .http
            .post(&url)
            .bearer_auth(self.config.api_key.trim())
            .header(header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = http_response.status();
        tracing::debug!("Groq API response status: {}", status);

        if status == 401 || status == 403 {
            return Err(GroqError::AuthError);
        }

        if status == 429 {
            return Err(GroqError::RateLimited);
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(GroqError::HttpError { status: status.as_u16() });
        }

        let bytes = http_response.bytes().await?;
        let parsed: CompletionResponse =
            serde_json::from_slice(&bytes).map_err(|e| GroqError::Parse(e.to_string()))?;

        let content = parsed.into_first_content().ok_or(GroqError::EmptyResponse)?;

        tracing::debug!("completion received in {:?}, {} chars", start.elapsed(), content.chars().count());

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header as header_matcher, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GroqClient {
        GroqClient::new(GroqConfig {
            api_key: "test-key".into(),
            base_url: server.uri(),
            system_prompt: "be an expert".into(),
            ..Default::default()
        })
        .unwrap()
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}]
        })
    }

    #[test]
    fn test_client_new_missing_key() {
        let result = GroqClient::new(GroqConfig::default());
        assert!(matches!(result, Err(GroqError::MissingApiKey)));
    }

    #[test]
    fn test_config_from_app() {
        let app = AppConfig {
            groq_api_key: Some("k".into()),
            groq_base_url: "https://llm.example.com/v1/".into(),
            groq_model: "tiny".into(),
            ..Default::default()
        };
        let config = GroqConfig::from_app(&app).unwrap();
        assert_eq!(config.api_key, "k");
        assert_eq!(config.base_url, "https://llm.example.com/v1");
        assert_eq!(config.model, "tiny");
        assert_eq!(config.timeout, Duration::from_millis(20_000));
    }

    #[test]
    fn test_config_from_app_missing_key() {
        let result = GroqConfig::from_app(&AppConfig::default());
        assert!(matches!(result, Err(GroqError::MissingApiKey)));
    }

    #[tokio::test]
    async fn test_complete_sends_preamble_first() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header_matcher("authorization", "Bearer test-key"))
            .and(body_json(json!({
                "model": "llama-3.1-8b-instant",
                "messages": [
                    {"role": "system", "content": "be an expert"},
                    {"role": "user", "content": "earlier"},
                    {"role": "assistant", "content": "reply"},
                    {"role": "user", "content": "now"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Cats purr.")))
            .expect(1)
            .mount(&server)
            .await;

        let history =
            [ChatMessage::user("earlier"), ChatMessage::assistant("reply"), ChatMessage::user("now")];
        let answer = client(&server).complete(&history).await.unwrap();
        assert_eq!(answer, "Cats purr.");
    }

    #[tokio::test]
    async fn test_complete_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = client(&server).complete(&[ChatMessage::user("hi")]).await;
        assert!(matches!(result, Err(GroqError::AuthError)));
    }

    #[tokio::test]
    async fn test_complete_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let result = client(&server).complete(&[ChatMessage::user("hi")]).await;
        assert!(matches!(result, Err(GroqError::RateLimited)));
    }

    #[tokio::test]
    async fn test_complete_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = client(&server).complete(&[ChatMessage::user("hi")]).await;
        assert!(matches!(result, Err(GroqError::HttpError { status: 503 })));
    }

    #[tokio::test]
    async fn test_complete_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let result = client(&server).complete(&[ChatMessage::user("hi")]).await;
        assert!(matches!(result, Err(GroqError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_complete_unparsable_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let result = client(&server).complete(&[ChatMessage::user("hi")]).await;
        assert!(matches!(result, Err(GroqError::Parse(_))));
    }
}
