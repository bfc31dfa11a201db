//! Analysis results and the payloads exchanged with the analysis service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CaseId, ResultId};
use crate::macros::string_enum;

/// Overall customer sentiment of a resolved case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sentiment {
    /// Issue resolved to the customer's satisfaction.
    Positive,
    /// Closed without a clear outcome.
    Neutral,
    /// Unresolved, unhappy, or abandoned.
    Negative,
}

string_enum!(Sentiment {
    Positive => "POSITIVE",
    Neutral => "NEUTRAL",
    Negative => "NEGATIVE",
});

/// Durable record written once when a case resolves. Immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Result ID.
    pub id: ResultId,
    /// Owning case (one result per case).
    pub case_id: CaseId,
    /// One-line classification.
    pub classification: Option<String>,
    /// Narrative summary.
    pub summary: Option<String>,
    /// Sentiment.
    pub sentiment: Option<Sentiment>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time (equal to `created_at`; results are never edited).
    pub updated_at: DateTime<Utc>,
}

/// Analysis service output for a resolved conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionAnalysis {
    /// One-line classification.
    pub classification: String,
    /// Narrative summary.
    pub summary: String,
    /// Sentiment.
    pub sentiment: Sentiment,
}

/// Analysis service output for an agent's summarize request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// What the customer is asking about.
    pub summary: String,
    /// Three reply drafts: direct, empathetic, clarifying.
    pub suggested_responses: [String; 3],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_analysis_parses_model_shape() {
        let raw = r#"{"classification":"A PAYMENT issue","summary":"User paid.","sentiment":"POSITIVE"}"#;
        let parsed: ResolutionAnalysis = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.sentiment, Sentiment::Positive);
    }

    #[test]
    fn summary_requires_exactly_three_suggestions() {
        let ok = r#"{"summary":"s","suggestedResponses":["a","b","c"]}"#;
        assert!(serde_json::from_str::<ConversationSummary>(ok).is_ok());
        let short = r#"{"summary":"s","suggestedResponses":["a","b"]}"#;
        assert!(serde_json::from_str::<ConversationSummary>(short).is_err());
    }

    #[test]
    fn unknown_sentiment_rejected() {
        assert!("ANGRY".parse::<Sentiment>().is_err());
    }
}
