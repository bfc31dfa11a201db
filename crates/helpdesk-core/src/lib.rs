//! # helpdesk-core
//!
//! Foundation types shared by every helpdesk crate:
//!
//! - **Cases**: [`Case`], [`CaseStatus`], [`Category`] and the category → priority table
//! - **Messages**: [`Message`] and [`SenderRole`]
//! - **Analysis**: [`AnalysisResult`], [`Sentiment`], and the analysis payloads
//! - **Identity**: [`Role`] and [`Identity`] as supplied by the authentication layer
//! - **Errors**: [`CaseError`] with stable wire codes, HTTP statuses and close codes
//! - **Time**: fixed-width UTC timestamp encoding used for storage and cut-offs

#![deny(unsafe_code)]

pub mod analysis;
pub mod case;
pub mod constants;
pub mod errors;
pub mod identity;
pub mod ids;
pub mod message;
pub mod time;

mod macros;

pub use analysis::{AnalysisResult, ConversationSummary, ResolutionAnalysis, Sentiment};
pub use case::{Case, CaseStatus, Category, ResolvedBy};
pub use errors::{CaseError, ErrorCode};
pub use identity::{Identity, Role};
pub use ids::{CaseId, ConnectionId, MessageId, ResultId, UserId};
pub use message::{Message, SenderRole};
