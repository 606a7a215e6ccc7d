pub mod confidence;
pub mod grounding;
pub mod guardrails;
pub mod matcher;
pub mod merge;
pub mod orchestrator;

pub use confidence::*;
pub use grounding::*;
pub use guardrails::*;
pub use matcher::*;
pub use merge::*;
pub use orchestrator::*;
