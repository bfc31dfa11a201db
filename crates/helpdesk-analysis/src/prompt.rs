//! Transcript formatting, prompt construction and reply parsing.

use helpdesk_core::{Category, Message, ResolvedBy};
use serde::de::DeserializeOwned;

use crate::errors::AnalysisError;

/// Transcript line for each message: `[ROLE]: content`.
pub fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("[{}]: {}", m.sender_role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn category_label(category: Option<Category>) -> &'static str {
    category.map_or("UNKNOWN", Category::as_str)
}

/// Prompt asking for a summary and three reply drafts for the selected
/// messages.
pub fn summarize_prompt(messages: &[Message], category: Option<Category>) -> String {
    let single = messages.len() == 1;
    let (selection, heading, summary_hint) = if single {
        (
            "a specific message from a user",
            "Selected message:",
            "a concise one-sentence summary of what the user is asking or reporting in this message",
        )
    } else {
        (
            "a set of messages from a conversation",
            "Selected messages:",
            "a concise summary of what the customer issue is and what has been discussed across these messages",
        )
    };
    format!(
        r#"You are a customer support AI assistant. An agent has selected {selection} and needs help crafting a response.

Complaint category: {category}

{heading}
{transcript}

Analyze this and return ONLY a valid JSON object with this exact shape (no markdown, no explanation):
{{
  "summary": "{summary_hint}",
  "suggestedResponses": [
    "<response option 1: direct and solution-focused>",
    "<response option 2: empathetic and reassuring tone>",
    "<response option 3: asks a clarifying question to gather more information>"
  ]
}}"#,
        category = category_label(category),
        transcript = format_transcript(messages),
    )
}

/// Prompt asking for classification, narrative summary and sentiment of a
/// closed conversation.
pub fn resolution_prompt(
    messages: &[Message],
    category: Option<Category>,
    resolved_by: ResolvedBy,
) -> String {
    let transcript = if messages.is_empty() {
        "(No messages in this complaint)".to_string()
    } else {
        format_transcript(messages)
    };
    let how = match resolved_by {
        ResolvedBy::User => "resolved by the user",
        ResolvedBy::System => "auto-resolved by the system after 24 hours of inactivity",
    };
    format!(
        r#"You are a customer support quality analyst. A complaint has been {how}.

Complaint category: {category}

Conversation transcript:
{transcript}

Analyze this and return ONLY a valid JSON object with this exact shape (no markdown, no explanation):
{{
  "summary": "<a narrative summary of the whole conversation in chronological order, third person, past tense, covering what the user reported, what the agent asked or did, and how it concluded>",
  "classification": "<one sentence: '[CATEGORY] issue, [what actually happened]', e.g. 'A PAYMENT issue, user did not receive the item they had already paid for.'>",
  "sentiment": "<one of: POSITIVE, NEUTRAL, NEGATIVE>"
}}

For sentiment:
- POSITIVE: the issue was resolved satisfactorily or the customer expressed satisfaction
- NEUTRAL: the complaint closed without a clearly positive or negative outcome
- NEGATIVE: the issue was not resolved, the customer was unhappy, or the complaint timed out with no engagement"#,
        category = category_label(category),
    )
}

/// Strip a surrounding markdown code fence (with optional language tag).
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    let body = body.trim();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse the model's reply as JSON of the expected shape.
pub fn parse_reply<T: DeserializeOwned>(text: &str) -> Result<T, AnalysisError> {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }
    serde_json::from_str(cleaned).map_err(|e| AnalysisError::Malformed(e.to_string()))
}
