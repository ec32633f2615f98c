use serde::Deserialize;
use std::fmt;

fn default_api_base() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_max_tokens() -> u32 {
    500
}

/// Language-model credentials and tuning for live analysis.
#[derive(Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Reply budget — verdicts are small JSON objects, so this stays low to
    /// bound both latency and cost.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// API base URL. Overridable for tests.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl AnalysisConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_base: default_api_base(),
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("api_base", &self.api_base)
            .finish()
    }
}
