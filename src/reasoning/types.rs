use crate::models::Flag;

use super::BackendError;

/// Local inference backend abstraction (allows mocking)
pub trait InferenceBackend {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
    ) -> Result<String, BackendError>;

    fn is_model_available(&self, model: &str) -> Result<bool, BackendError>;

    fn list_models(&self) -> Result<Vec<String>, BackendError>;
}

/// Outcome of one generated-reasoning pass, before validation and merging.
#[derive(Debug, Clone, Default)]
pub struct GeneratedReview {
    /// Candidate flags proposed by the model. Evidence is unverified at
    /// this point; the grounding validator decides what survives.
    pub flags: Vec<Flag>,
    /// Open questions the model raised about information the record lacks.
    pub missing_info_questions: Vec<String>,
}

impl GeneratedReview {
    pub fn empty() -> Self {
        Self::default()
    }
}
