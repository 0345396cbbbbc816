//! `POST /api/chat`: answer a question, grounded on the page it links to.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use scrapechat_client::{ChatMessage, split_message};
use scrapechat_core::Error;
use serde::{Deserialize, Serialize};

use crate::app::AppState;

/// Reply text sent whenever answering fails.
pub const ERROR_REPLY: &str = "Error";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Earlier turns of the conversation, oldest first.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    pub message: String,
}

/// Final user turn handed to the model.
pub fn build_prompt(question: &str, scraped: &str) -> String {
    format!("Answer my question : \"{question}\"\n\nBased on the following content : <content> {scraped} </content>")
}

/// Decode a request body as JSON whatever its content type says.
pub fn parse_request(body: &[u8]) -> Result<ChatRequest, Error> {
    serde_json::from_slice(body).map_err(|e| Error::InvalidInput(format!("chat request: {e}")))
}

pub async fn handle_chat(State(state): State<AppState>, body: Bytes) -> Json<ChatReply> {
    let answer = match parse_request(&body) {
        Ok(request) => answer(&state, request).await,
        Err(e) => Err(e),
    };

    match answer {
        Ok(message) => Json(ChatReply { message }),
        Err(e) => {
            tracing::error!(error = %e, "chat request failed");
            Json(ChatReply { message: ERROR_REPLY.to_string() })
        }
    }
}

async fn answer(state: &AppState, request: ChatRequest) -> Result<String, Error> {
    let (url, question) = split_message(&request.message);

    let scraped = match url {
        Some(url) => {
            tracing::debug!(url = %url, "url found in message");
            state.scraper.scrape(url).await.content
        }
        None => String::new(),
    };

    let mut messages = request.messages;
    messages.push(ChatMessage::user(build_prompt(&question, &scraped)));

    Ok(state.chat.complete(&messages).await?)
}
