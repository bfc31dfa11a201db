//! Policy constants for chat validation and the lifecycle sweep.

use std::time::Duration;

use crate::analysis::Sentiment;

/// Package version (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum chat message length, in Unicode scalar values.
pub const MAX_MESSAGE_CHARS: usize = 5000;

/// Age after which an unresolved case is force-resolved and messages are purged.
pub const STALENESS_THRESHOLD: Duration = Duration::from_secs(24 * 60 * 60);

/// Period between lifecycle sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Classification recorded on analysis results synthesized by the sweeper.
pub const AUTO_RESOLVED_CLASSIFICATION: &str = "auto-resolved";

/// Sentiment recorded by the sweeper when the case had at least one message.
pub const AUTO_RESOLVED_SENTIMENT_WITH_MESSAGES: Sentiment = Sentiment::Neutral;

/// Sentiment recorded by the sweeper when nobody ever wrote in the case.
pub const AUTO_RESOLVED_SENTIMENT_WITHOUT_MESSAGES: Sentiment = Sentiment::Negative;

/// Summary recorded on analysis results synthesized by the sweeper.
pub fn auto_resolved_summary(message_count: usize) -> String {
    format!("Complaint auto-resolved after 24 hours. Total messages: {message_count}")
}

/// Sentiment heuristic for synthesized results: any engagement reads as
/// neutral, silence as negative.
pub fn auto_resolved_sentiment(message_count: usize) -> Sentiment {
    if message_count > 0 {
        AUTO_RESOLVED_SENTIMENT_WITH_MESSAGES
    } else {
        AUTO_RESOLVED_SENTIMENT_WITHOUT_MESSAGES
    }
}
