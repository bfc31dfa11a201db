//! Wire types for the `generateContent` endpoint.

use serde::{Deserialize, Serialize};

/// Request body.
#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    /// Conversation turns; a single user turn carrying the prompt.
    pub contents: Vec<Content>,
}

impl GenerateContentRequest {
    /// A request with one user turn.
    pub fn from_prompt(prompt: String) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part { text: Some(prompt) }],
            }],
        }
    }
}

/// One turn.
#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    /// `user` or `model`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts.
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A content part. Only text parts are used.
#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    /// Text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Response body.
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    /// Candidates; the first is used.
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
}

/// One candidate answer.
#[derive(Debug, Deserialize)]
pub struct Candidate {
    /// Candidate content.
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if any.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.as_ref()?.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}
