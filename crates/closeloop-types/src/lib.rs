//! Shared types for the Closeloop platform.
//!
//! Everything that crosses a crate boundary lives here: transcript
//! fragments and the SSE event vocabulary, analysis verdicts, and the
//! campaign / lead / call-log records persisted by `closeloop-db`.

pub mod analysis;
pub mod records;
pub mod transcript;

pub use analysis::{AnalysisVerdict, Sentiment};
pub use records::{
    CallLog, Campaign, CampaignStatus, Lead, LeadStatus, NewCallLog, NewCampaign, NewLead,
};
pub use transcript::{CallLifecycle, Speaker, StreamEvent, TranscriptFragment};
