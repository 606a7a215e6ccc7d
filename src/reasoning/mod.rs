pub mod adapter;
pub mod ollama;
pub mod parser;
pub mod prompt;
pub mod types;

pub use adapter::*;
pub use ollama::*;
pub use parser::*;
pub use prompt::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Inference backend is not reachable at {0}")]
    Connection(String),

    #[error("Inference backend returned error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("Model {0} is not installed on the backend")]
    ModelMissing(String),

    #[error("No compatible review model available")]
    NoModelAvailable,

    #[error("Inference request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),
}
