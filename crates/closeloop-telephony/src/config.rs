use serde::Deserialize;
use std::fmt;

fn default_api_base() -> String {
    "https://api.twilio.com".to_string()
}

/// Twilio account credentials and the caller-id number.
#[derive(Clone, Deserialize)]
pub struct TwilioConfig {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    /// The origin number calls are placed from (E.164).
    #[serde(default)]
    pub from_number: String,
    /// REST API base URL. Overridable for tests.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl TwilioConfig {
    /// True when all credentials required to place a call are present.
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_number.is_empty()
    }
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            api_base: default_api_base(),
        }
    }
}

impl fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from_number", &self.from_number)
            .field("api_base", &self.api_base)
            .finish()
    }
}
