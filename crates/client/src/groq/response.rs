//! Chat-completions response types.

use serde::Deserialize;

/// Raw completion response; only the fields the client reads.
#[derive(Debug, Deserialize)]
pub(crate) struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssistantMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    /// Text of the first choice. A null `content` reads as empty text.
    pub fn into_first_content(self) -> Option<String> {
        self.choices.into_iter().next().map(|choice| choice.message.content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_choice_wins() {
        let raw = r#"{"id":"x","choices":[
            {"index":0,"message":{"role":"assistant","content":"first"}},
            {"index":1,"message":{"role":"assistant","content":"second"}}
        ]}"#;
        let response: CompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.into_first_content().as_deref(), Some("first"));
    }

    #[test]
    fn test_no_choices() {
        let response: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(response.into_first_content().is_none());
    }

    #[test]
    fn test_null_content() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let response: CompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.into_first_content().as_deref(), Some(""));
    }
}
