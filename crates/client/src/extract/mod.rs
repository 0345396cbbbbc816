//! Page text extraction.
//!
//! ### Algorithm
//! - Detach tags with no textual value (scripts, media, forms) before reading any text.
//! - Read title, meta description, h1/h2, `article`, `main`, content-named blocks,
//!   paragraphs and list items independently, each category space-joined in
//!   document order.
//! - Concatenate in that order, collapse whitespace, cap at 40,000 characters.
//!
//! ### Stable Abstraction
//! - Uses the `Extractor` trait so the scrape pipeline does not depend on the engine.

pub mod normalize;

pub use normalize::{clean_text, truncate_chars};

use std::sync::LazyLock;

use scraper::{Html, Selector};
use scrapechat_core::record::MAX_CONTENT_CHARS;
use scrapechat_core::{Error, Headings, ScrapedContent};

/// Elements removed before extraction; their inner text never reaches the record.
pub const STRIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "img", "video", "audio", "form", "button",
];

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("invalid selector")
}

static STRIPPED: LazyLock<Selector> = LazyLock::new(|| selector(&STRIPPED_TAGS.join(", ")));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static META_DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| selector(r#"meta[name="description"]"#));
static H1: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static H2: LazyLock<Selector> = LazyLock::new(|| selector("h2"));
static ARTICLE: LazyLock<Selector> = LazyLock::new(|| selector("article"));
static MAIN: LazyLock<Selector> = LazyLock::new(|| selector("main"));
static CONTENT_BLOCKS: LazyLock<Selector> =
    LazyLock::new(|| selector(r#".content, #content, [class*="content"], [id*="content"]"#));
static PARAGRAPHS: LazyLock<Selector> = LazyLock::new(|| selector("p"));
static LIST_ITEMS: LazyLock<Selector> = LazyLock::new(|| selector("li"));

/// Stable extractor trait for page text extraction.
pub trait Extractor: Send + Sync {
    /// Build a successful record for `url` from its HTML.
    fn extract(&self, html: &str, url: &str) -> Result<ScrapedContent, Error>;
}

/// CSS-selector extractor built on the `scraper` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectorExtractor;

impl SelectorExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for SelectorExtractor {
    fn extract(&self, html: &str, url: &str) -> Result<ScrapedContent, Error> {
        let mut document = Html::parse_document(html);
        strip_non_content(&mut document);

        let title = joined_text(&document, &TITLE, "");
        let meta_description = document
            .select(&META_DESCRIPTION)
            .next()
            .and_then(|el| el.value().attr("content"))
            .unwrap_or_default()
            .to_string();
        let h1 = joined_text(&document, &H1, " ");
        let h2 = joined_text(&document, &H2, " ");

        let article = joined_text(&document, &ARTICLE, " ");
        let main = joined_text(&document, &MAIN, " ");
        let blocks = joined_text(&document, &CONTENT_BLOCKS, " ");
        let paragraphs = joined_text(&document, &PARAGRAPHS, " ");
        let list_items = joined_text(&document, &LIST_ITEMS, " ");

        let combined = [
            &title,
            &meta_description,
            &h1,
            &h2,
            &article,
            &main,
            &blocks,
            &paragraphs,
            &list_items,
        ]
        .map(String::as_str)
        .join(" ");

        let content = truncate_chars(&clean_text(&combined), MAX_CONTENT_CHARS);

        tracing::debug!(url = %url, chars = content.chars().count(), "extracted page text");

        Ok(ScrapedContent {
            url: url.to_string(),
            title: clean_text(&title),
            headings: Headings { h1: clean_text(&h1), h2: clean_text(&h2) },
            meta_description: clean_text(&meta_description),
            content,
            error: None,
            cached_at: None,
        })
    }
}

/// Detach every stripped element from the tree.
fn strip_non_content(document: &mut Html) {
    let ids: Vec<_> = document.select(&STRIPPED).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Text of every match, each element's text nodes concatenated, matches joined by `sep`.
fn joined_text(document: &Html, selector: &Selector, sep: &str) -> String {
    document
        .select(selector)
        .map(|el| el.text().collect::<String>())
        .collect::<Vec<_>>()
        .join(sep)
}
