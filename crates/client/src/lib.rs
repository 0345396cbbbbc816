//! Outbound work for scrapechat.
//!
//! This crate provides the HTTP fetch pipeline, URL detection, page text
//! extraction, the scrape pipeline and the Groq chat-completions client used by
//! the server.

pub mod extract;
pub mod fetch;
pub mod groq;
pub mod scrape;

pub use extract::{Extractor, SelectorExtractor, clean_text};
pub use fetch::{FetchClient, FetchConfig, FetchResponse, find_url, split_message};
pub use groq::{ChatMessage, ChatModel, GroqClient, GroqConfig, GroqError, Role};
pub use scrape::Scraper;
