pub mod catalog;
pub mod rules;

pub use catalog::*;
pub use rules::*;

use thiserror::Error;

/// Knowledge base loading failures are fatal at startup: the engine must
/// refuse to run with a missing or empty rule table rather than silently
/// audit against nothing.
#[derive(Error, Debug)]
pub enum KnowledgeBaseError {
    #[error("Failed to read knowledge base file {0}: {1}")]
    Load(String, String),

    #[error("Failed to parse {0}: {1}")]
    Parse(String, String),

    #[error("Interaction rule table is empty")]
    EmptyRuleSet,

    #[error("Interaction rule table declares no version")]
    MissingVersion,

    #[error("Duplicate interaction rule id: {0}")]
    DuplicateRuleId(String),
}
