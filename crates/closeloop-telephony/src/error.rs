use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelephonyError {
    /// Missing or unusable credentials — requires operator action, not a
    /// retry. Kept distinct from transient provider failures.
    #[error("telephony configuration error: {0}")]
    Config(String),

    /// The configured public origin points at a loopback/local address the
    /// telephony provider cannot reach. Also a configuration problem, but
    /// called out separately because the fix (expose a public URL) differs.
    #[error(
        "public origin '{0}' is local — the telephony provider cannot deliver \
         webhooks to it; deploy publicly or use a tunnel"
    )]
    LocalOrigin(String),

    #[error("invalid phone number: '{0}'")]
    InvalidPhoneNumber(String),

    /// The provider rejected the request; carries Twilio's own error code
    /// and human-readable message.
    #[error("provider rejected call (HTTP {status}, code {code:?}): {message}")]
    Provider {
        status: u16,
        code: Option<u64>,
        message: String,
    },

    #[error("telephony request failed: {0}")]
    Http(#[from] reqwest::Error),
}
