//! Conversational voice-agent integration for the Closeloop platform.
//!
//! Wraps the ElevenLabs conversational-AI API: obtaining a signed media
//! session URL (or registering the call directly and receiving TwiML back),
//! and fetching the platform's own conversation record after a call. The
//! control-document parser tolerates the three reply shapes the platform
//! has been observed to return.

pub mod bridge;
pub mod client;
pub mod config;
pub mod error;

pub use bridge::parse_control_document;
pub use client::{CallContext, ConversationRecord, ConversationTurn, VoiceAgentClient};
pub use config::{BridgeMode, VoiceAgentConfig};
pub use error::VoiceAgentError;
