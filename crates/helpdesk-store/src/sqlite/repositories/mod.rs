//! Stateless repositories. Every method takes `&Connection` (or a
//! transaction) and executes SQL; none hold state.

pub mod analysis_result;
pub mod case;
pub mod message;

pub use analysis_result::AnalysisResultRepo;
pub use case::{CaseRepo, ListCasesOptions};
pub use message::MessageRepo;
