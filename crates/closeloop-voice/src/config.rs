use serde::Deserialize;
use std::fmt;

fn default_api_base() -> String {
    "https://api.elevenlabs.io".to_string()
}

/// How the voice webhook obtains a call-control document for a call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeMode {
    /// Fetch a pre-signed media-session URL and emit a
    /// `<Connect><Stream>` document ourselves.
    #[default]
    SignedUrl,
    /// Register the call with the platform and pass its TwiML back
    /// verbatim.
    RegisterCall,
}

/// Voice-agent platform credentials and bridge behavior.
#[derive(Clone, Deserialize)]
pub struct VoiceAgentConfig {
    #[serde(default)]
    pub api_key: String,
    /// The configured conversational agent to bridge calls to.
    #[serde(default)]
    pub agent_id: String,
    /// API base URL. Overridable for tests.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub bridge_mode: BridgeMode,
}

impl VoiceAgentConfig {
    /// True when both the API key and agent id are present.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.agent_id.is_empty()
    }
}

impl Default for VoiceAgentConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            agent_id: String::new(),
            api_base: default_api_base(),
            bridge_mode: BridgeMode::default(),
        }
    }
}

impl fmt::Debug for VoiceAgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceAgentConfig")
            .field("api_key", &"[REDACTED]")
            .field("agent_id", &self.agent_id)
            .field("api_base", &self.api_base)
            .field("bridge_mode", &self.bridge_mode)
            .finish()
    }
}
