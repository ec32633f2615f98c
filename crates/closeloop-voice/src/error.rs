use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoiceAgentError {
    /// Missing credentials — requires operator action, not a retry.
    #[error("voice agent configuration error: {0}")]
    Config(String),

    /// The platform returned a non-success status.
    #[error("voice agent API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    /// The platform's reply matched neither raw markup nor any known JSON
    /// envelope shape.
    #[error("malformed voice agent response: {0}")]
    MalformedResponse(String),

    #[error("voice agent request failed: {0}")]
    Http(#[from] reqwest::Error),
}
