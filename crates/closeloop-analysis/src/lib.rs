//! Live call analysis for the Closeloop platform.
//!
//! For each new transcript fragment, renders the bounded conversation
//! history into a prompt, makes one bounded round trip to the language
//! model, and extracts a structured verdict (confidence score, sentiment,
//! buying signals, recommendation) from the reply. Extraction failures
//! degrade to a neutral verdict so the dashboard's "live" read never turns
//! into an error banner.
//!
//! Also hosts batch lead scoring: one `SCORE:`/`REASON:` round trip per
//! lead of a campaign, with the same degrade-don't-fail posture.

pub mod config;
pub mod engine;
mod extract;
pub mod scoring;

pub use config::AnalysisConfig;
pub use engine::{AnalysisEngine, AnalysisError, AnalysisRequest, HistoryTurn};
pub use extract::first_json_object;
pub use scoring::LeadScore;
