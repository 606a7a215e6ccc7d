/// Engine-level constants
pub const APP_NAME: &str = "Sentira";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default Ollama endpoint on the local machine.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:11434";

/// Default wall-clock bound on the generative pass.
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 90;

/// Runtime settings for one auditor instance.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Base URL of the inference backend.
    pub backend_url: String,
    /// Explicit model override. `None` lets the backend client pick the
    /// first installed review model.
    pub model: Option<String>,
    /// Wall-clock bound on the generative pass, in seconds.
    pub backend_timeout_secs: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            model: None,
            backend_timeout_secs: DEFAULT_BACKEND_TIMEOUT_SECS,
        }
    }
}

impl AuditConfig {
    /// Defaults, with the backend URL taken from `OLLAMA_HOST` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            if !host.trim().is_empty() {
                config.backend_url = host.trim().to_string();
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_ollama() {
        let config = AuditConfig::default();
        assert_eq!(config.backend_url, "http://localhost:11434");
        assert!(config.model.is_none());
        assert_eq!(config.backend_timeout_secs, 90);
    }

    #[test]
    fn env_host_overrides_default() {
        std::env::set_var("OLLAMA_HOST", "http://10.0.0.5:11434");
        let config = AuditConfig::from_env();
        std::env::remove_var("OLLAMA_HOST");
        assert_eq!(config.backend_url, "http://10.0.0.5:11434");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.3.0");
    }
}
