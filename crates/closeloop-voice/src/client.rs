//! HTTP client for the conversational voice-agent platform.

use crate::bridge::parse_control_document;
use crate::config::VoiceAgentConfig;
use crate::error::VoiceAgentError;
use closeloop_types::{Speaker, TranscriptFragment};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

/// Timeout for voice-platform API requests. The voice webhook sits on the
/// telephony provider's answer path, so this must stay short.
const API_TIMEOUT: Duration = Duration::from_secs(10);

/// Telephony metadata passed when registering a call directly with the
/// platform (the `register_call` bridge variant).
#[derive(Debug, Clone)]
pub struct CallContext {
    pub call_sid: String,
    pub from: String,
    pub to: String,
    pub direction: String,
}

/// One turn from the platform's conversation record.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub time_in_call_secs: Option<f64>,
}

/// The platform's record of a conversation, fetched after (or during) a call.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationRecord {
    /// "processing" while the call is live, "done" afterwards.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub transcript: Vec<ConversationTurn>,
}

impl ConversationRecord {
    /// Maps the platform's turns into transcript fragments, attributing
    /// `agent` turns to the agent and everything else to the prospect.
    pub fn into_fragments(self) -> Vec<TranscriptFragment> {
        self.transcript
            .into_iter()
            .enumerate()
            .map(|(i, turn)| TranscriptFragment {
                id: format!("msg-{i}"),
                speaker: if turn.role == "agent" {
                    Speaker::Agent
                } else {
                    Speaker::Prospect
                },
                text: turn.message,
                timestamp: String::new(),
                time_in_call_secs: turn.time_in_call_secs,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    signed_url: Option<String>,
}

/// Client for the conversational voice-agent platform's REST API.
#[derive(Debug, Clone)]
pub struct VoiceAgentClient {
    http: reqwest::Client,
    config: VoiceAgentConfig,
}

impl VoiceAgentClient {
    pub fn new(config: VoiceAgentConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &VoiceAgentConfig {
        &self.config
    }

    fn require_configured(&self) -> Result<(), VoiceAgentError> {
        if !self.config.is_configured() {
            return Err(VoiceAgentError::Config(
                "missing api_key or agent_id".to_string(),
            ));
        }
        Ok(())
    }

    /// Obtains a pre-signed media-session URL for the configured agent.
    pub async fn signed_connection_url(&self) -> Result<String, VoiceAgentError> {
        self.require_configured()?;
        let url = format!(
            "{}/v1/convai/conversation/get_signed_url?agent_id={}",
            self.config.api_base, self.config.agent_id
        );
        let response = self
            .http
            .get(&url)
            .header("xi-api-key", &self.config.api_key)
            .timeout(API_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceAgentError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SignedUrlResponse = response.json().await?;
        parsed.signed_url.filter(|u| !u.is_empty()).ok_or_else(|| {
            VoiceAgentError::MalformedResponse("no signed_url in response".to_string())
        })
    }

    /// Registers the call with the platform directly and returns the TwiML
    /// document the platform hands back (raw or JSON-enveloped).
    pub async fn register_call(
        &self,
        call: &CallContext,
        dynamic_variables: &HashMap<String, String>,
    ) -> Result<String, VoiceAgentError> {
        self.require_configured()?;
        let url = format!("{}/v1/convai/twilio/register-call", self.config.api_base);
        let response = self
            .http
            .post(&url)
            .header("xi-api-key", &self.config.api_key)
            .json(&json!({
                "agent_id": self.config.agent_id,
                "call_sid": call.call_sid,
                "from_number": call.from,
                "to_number": call.to,
                "direction": call.direction,
                "conversation_initiation_client_data": {
                    "dynamic_variables": dynamic_variables,
                },
            }))
            .timeout(API_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(VoiceAgentError::Api {
                status: status.as_u16(),
                body,
            });
        }
        parse_control_document(&body)
    }

    /// Fetches the platform's conversation record (transcript with
    /// offset-into-call timings).
    pub async fn conversation(
        &self,
        conversation_id: &str,
    ) -> Result<ConversationRecord, VoiceAgentError> {
        self.require_configured()?;
        let url = format!(
            "{}/v1/convai/conversations/{}",
            self.config.api_base, conversation_id
        );
        let response = self
            .http
            .get(&url)
            .header("xi-api-key", &self.config.api_key)
            .timeout(API_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceAgentError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_client_fails_before_any_network_call() {
        let client = VoiceAgentClient::new(VoiceAgentConfig::default());
        match client.signed_connection_url().await {
            Err(VoiceAgentError::Config(_)) => {}
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn conversation_record_maps_roles_to_speakers() {
        let record = ConversationRecord {
            status: "done".to_string(),
            transcript: vec![
                ConversationTurn {
                    role: "agent".to_string(),
                    message: "Hi, this is Ava from Acme.".to_string(),
                    time_in_call_secs: Some(1.2),
                },
                ConversationTurn {
                    role: "user".to_string(),
                    message: "I'm interested".to_string(),
                    time_in_call_secs: Some(4.8),
                },
            ],
        };
        let fragments = record.into_fragments();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].speaker, Speaker::Agent);
        assert_eq!(fragments[0].id, "msg-0");
        assert_eq!(fragments[1].speaker, Speaker::Prospect);
        assert_eq!(fragments[1].time_in_call_secs, Some(4.8));
    }
}
