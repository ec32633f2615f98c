//! Twilio REST client for outbound call placement.

use crate::config::TwilioConfig;
use crate::error::TelephonyError;
use serde::Deserialize;
use std::time::Duration;

/// Timeout for call-placement requests against the Twilio API.
const API_TIMEOUT: Duration = Duration::from_secs(15);

/// Lifecycle events Twilio reports to the status callback.
const STATUS_CALLBACK_EVENTS: &[&str] = &["initiated", "ringing", "answered", "completed"];

/// The callback URLs registered with each outbound call, all derived from
/// the deployment's public origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackUrls {
    /// Invoked once when the call is answered; must return TwiML.
    pub voice: String,
    /// Invoked on each lifecycle transition.
    pub status: String,
    /// Invoked when recording processing completes.
    pub recording: String,
}

impl CallbackUrls {
    /// Derives the three callback URLs from the configured public origin.
    ///
    /// Fails with a distinct configuration error when the origin is empty
    /// or points at a local address the provider cannot reach. The check is
    /// textual on purpose: "localhost"/"127.0.0.1" in the origin is exactly
    /// the misconfiguration seen in local development.
    pub fn from_origin(origin: &str) -> Result<Self, TelephonyError> {
        let origin = origin.trim_end_matches('/');
        if origin.is_empty() {
            return Err(TelephonyError::Config(
                "public_origin is not configured".to_string(),
            ));
        }
        if origin.contains("localhost") || origin.contains("127.0.0.1") || origin.contains("[::1]")
        {
            return Err(TelephonyError::LocalOrigin(origin.to_string()));
        }
        Ok(Self {
            voice: format!("{origin}/webhooks/twilio/voice"),
            status: format!("{origin}/webhooks/twilio/status"),
            recording: format!("{origin}/webhooks/twilio/recording"),
        })
    }
}

/// Twilio's response to a successful call-creation request.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacedCall {
    /// Provider-assigned call identifier.
    pub sid: String,
    /// Initial call state (usually "queued").
    pub status: String,
}

/// Twilio's error envelope for rejected requests.
#[derive(Debug, Deserialize)]
struct ProviderError {
    code: Option<u64>,
    message: Option<String>,
}

/// Client for the Twilio Calls API.
#[derive(Debug, Clone)]
pub struct TwilioClient {
    http: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioClient {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Asks Twilio to place an outbound call to `to`, registering the voice,
    /// status, and recording callbacks. Recording is always enabled.
    ///
    /// Configuration problems are reported before any network call. Provider
    /// rejections carry Twilio's error code and message. Transient failures
    /// are surfaced, not retried — retry policy belongs to the caller.
    pub async fn place_call(
        &self,
        to: &str,
        callbacks: &CallbackUrls,
    ) -> Result<PlacedCall, TelephonyError> {
        if !self.config.is_configured() {
            return Err(TelephonyError::Config(
                "missing account_sid, auth_token, or from_number".to_string(),
            ));
        }

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.config.api_base, self.config.account_sid
        );

        let mut form: Vec<(&str, &str)> = vec![
            ("To", to),
            ("From", &self.config.from_number),
            ("Url", &callbacks.voice),
            ("StatusCallback", &callbacks.status),
            ("StatusCallbackMethod", "POST"),
            ("Record", "true"),
            ("RecordingStatusCallback", &callbacks.recording),
            ("RecordingStatusCallbackMethod", "POST"),
        ];
        for event in STATUS_CALLBACK_EVENTS {
            form.push(("StatusCallbackEvent", event));
        }

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .timeout(API_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let parsed: Option<ProviderError> = serde_json::from_str(&body).ok();
            let (code, message) = match parsed {
                Some(e) => (e.code, e.message.unwrap_or(body)),
                None => (None, body),
            };
            tracing::warn!(%status, ?code, "call placement rejected by provider");
            return Err(TelephonyError::Provider {
                status: status.as_u16(),
                code,
                message,
            });
        }

        let placed: PlacedCall = response.json().await?;
        tracing::info!(call_sid = %placed.sid, status = %placed.status, to, "outbound call placed");
        Ok(placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_urls_derive_from_origin() {
        let urls = CallbackUrls::from_origin("https://app.example.com/").unwrap();
        assert_eq!(urls.voice, "https://app.example.com/webhooks/twilio/voice");
        assert_eq!(urls.status, "https://app.example.com/webhooks/twilio/status");
        assert_eq!(
            urls.recording,
            "https://app.example.com/webhooks/twilio/recording"
        );
    }

    #[test]
    fn local_origins_are_rejected_distinctly() {
        for origin in [
            "http://localhost:3000",
            "http://127.0.0.1:8080",
            "http://[::1]:3000",
        ] {
            match CallbackUrls::from_origin(origin) {
                Err(TelephonyError::LocalOrigin(_)) => {}
                other => panic!("expected LocalOrigin error for {origin}, got {other:?}"),
            }
        }
    }

    #[test]
    fn empty_origin_is_a_config_error() {
        assert!(matches!(
            CallbackUrls::from_origin(""),
            Err(TelephonyError::Config(_))
        ));
    }

    #[tokio::test]
    async fn unconfigured_client_fails_before_any_network_call() {
        let client = TwilioClient::new(TwilioConfig::default());
        let callbacks = CallbackUrls::from_origin("https://app.example.com").unwrap();
        match client.place_call("+15551234567", &callbacks).await {
            Err(TelephonyError::Config(_)) => {}
            other => panic!("expected Config error, got {other:?}"),
        }
    }
}
