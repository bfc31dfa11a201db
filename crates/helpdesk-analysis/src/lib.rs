//! # helpdesk-analysis
//!
//! The Analysis Service: turns a case transcript into a summary with reply
//! suggestions, or into the classification, summary and sentiment recorded
//! when a case resolves.
//!
//! Calls cost money and may fail; callers must not assume they are
//! idempotent and should not retry blindly.

#![deny(unsafe_code)]

pub mod errors;
pub mod gemini;
pub mod prompt;
pub mod types;

pub use errors::AnalysisError;
pub use gemini::{GeminiAnalysisService, GeminiConfig};

use async_trait::async_trait;
use helpdesk_core::{Category, ConversationSummary, Message, ResolutionAnalysis, ResolvedBy};

/// Text-generation backed conversation analysis.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Summarize the selected messages and draft three replies.
    async fn summarize(
        &self,
        messages: &[Message],
        category: Option<Category>,
    ) -> Result<ConversationSummary, AnalysisError>;

    /// Classify and summarize a closed conversation.
    async fn analyze_resolution(
        &self,
        messages: &[Message],
        category: Option<Category>,
        resolved_by: ResolvedBy,
    ) -> Result<ResolutionAnalysis, AnalysisError>;
}
