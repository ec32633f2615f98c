//! Telephony integration for the Closeloop platform.
//!
//! Wraps the Twilio REST API for outbound call placement, derives the
//! webhook callback URLs Twilio needs to reach this deployment, and builds
//! TwiML call-control documents for the voice webhook responses.

pub mod client;
pub mod config;
pub mod error;
pub mod twiml;

pub use client::{CallbackUrls, PlacedCall, TwilioClient};
pub use config::TwilioConfig;
pub use error::TelephonyError;
pub use twiml::VoiceResponse;

use error::TelephonyError as Error;

/// Validates a destination phone number: an optional leading `+` followed
/// by 8 to 15 digits, nothing else.
pub fn validate_phone_number(number: &str) -> Result<(), Error> {
    let digits = number.strip_prefix('+').unwrap_or(number);
    if digits.len() < 8 || digits.len() > 15 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidPhoneNumber(number.to_string()));
    }
    Ok(())
}
