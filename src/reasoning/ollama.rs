use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::types::InferenceBackend;
use super::BackendError;

/// Preferred review models in order of preference.
const REVIEW_MODELS: &[&str] = &[
    "amsaravi/medgemma-4b-it:q6",
    "medgemma",
    "medgemma:4b",
    "medgemma:latest",
];

/// Stop sequences cut generation at a code fence or a fresh chat turn.
const STOP_SEQUENCES: &[&str] = &["```", "<start_of_turn>"];

/// Ollama HTTP client for local review inference.
pub struct OllamaBackend {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaBackend {
    /// Create a new OllamaBackend pointing at a local Ollama instance.
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        }
    }

    /// Find the best available review model.
    pub fn find_best_model(&self) -> Result<String, BackendError> {
        let available = self.list_models()?;
        for preferred in REVIEW_MODELS {
            if available.iter().any(|m| m.starts_with(preferred)) {
                return Ok(preferred.to_string());
            }
        }
        Err(BackendError::NoModelAvailable)
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    format: &'a str,
    options: OllamaOptions,
    stop: &'a [&'a str],
    // Keep model weights loaded between calls in a review session.
    keep_alive: &'a str,
}

/// Sampling options tuned for deterministic clinical review output.
#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_ctx: u32,
    num_predict: u32,
    top_k: u32,
    top_p: f32,
}

impl Default for OllamaOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            num_ctx: 4096,
            num_predict: 512,
            top_k: 40,
            top_p: 0.9,
        }
    }
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Response body from Ollama /api/tags
#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

impl InferenceBackend for OllamaBackend {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
    ) -> Result<String, BackendError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model,
            prompt,
            system,
            stream: false,
            format: "json",
            options: OllamaOptions::default(),
            stop: STOP_SEQUENCES,
            keep_alive: "10m",
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    BackendError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    BackendError::Timeout(self.timeout_secs)
                } else {
                    BackendError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::ModelMissing(model.to_string()));
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BackendError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;

        Ok(parsed.response)
    }

    fn is_model_available(&self, model: &str) -> Result<bool, BackendError> {
        let models = self.list_models()?;
        Ok(models.iter().any(|m| m.starts_with(model)))
    }

    fn list_models(&self) -> Result<Vec<String>, BackendError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().map_err(|e| {
            if e.is_connect() {
                BackendError::Connection(self.base_url.clone())
            } else {
                BackendError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BackendError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }
}

/// Mock backend for testing. Returns scripted responses in order, repeating
/// the last one once the script runs out.
pub struct MockBackend {
    responses: Vec<String>,
    call_index: Mutex<usize>,
    available_models: Vec<String>,
    unreachable: bool,
}

impl MockBackend {
    pub fn new(response: &str) -> Self {
        Self {
            responses: vec![response.to_string()],
            call_index: Mutex::new(0),
            available_models: vec!["medgemma:latest".to_string()],
            unreachable: false,
        }
    }

    /// Script a different response per call, for retry paths.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses,
            call_index: Mutex::new(0),
            available_models: vec!["medgemma:latest".to_string()],
            unreachable: false,
        }
    }

    /// A backend that refuses every request, as if Ollama were not running.
    pub fn unreachable() -> Self {
        Self {
            responses: Vec::new(),
            call_index: Mutex::new(0),
            available_models: Vec::new(),
            unreachable: true,
        }
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.available_models = models;
        self
    }

    pub fn calls_made(&self) -> usize {
        *self.call_index.lock().unwrap()
    }
}

impl InferenceBackend for MockBackend {
    fn generate(
        &self,
        _model: &str,
        _prompt: &str,
        _system: &str,
    ) -> Result<String, BackendError> {
        let mut index = self.call_index.lock().unwrap();
        *index += 1;
        if self.unreachable {
            return Err(BackendError::Connection("http://localhost:11434".into()));
        }
        let position = (*index - 1).min(self.responses.len().saturating_sub(1));
        match self.responses.get(position) {
            Some(response) => Ok(response.clone()),
            None => Ok(String::new()),
        }
    }

    fn is_model_available(&self, model: &str) -> Result<bool, BackendError> {
        if self.unreachable {
            return Err(BackendError::Connection("http://localhost:11434".into()));
        }
        Ok(self.available_models.iter().any(|m| m.starts_with(model)))
    }

    fn list_models(&self) -> Result<Vec<String>, BackendError> {
        if self.unreachable {
            return Err(BackendError::Connection("http://localhost:11434".into()));
        }
        Ok(self.available_models.clone())
    }
}
