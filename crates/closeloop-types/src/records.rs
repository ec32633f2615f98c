//! Persisted campaign, lead, and call-log records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when parsing a stored status string fails.
#[derive(Debug, Error)]
#[error("unrecognized status: {0}")]
pub struct ParseStatusError(pub String);

/// Lifecycle of an outbound campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for CampaignStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outbound sales campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    /// Public UUID.
    pub id: String,
    pub name: String,
    /// Company the campaign sells for.
    pub company: String,
    /// What is being sold; fed into lead scoring and agent context.
    pub product_description: Option<String>,
    pub target_audience: Option<String>,
    pub status: CampaignStatus,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}

/// Parameters for creating a campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCampaign {
    pub name: String,
    pub company: String,
    pub product_description: Option<String>,
    pub target_audience: Option<String>,
}

/// Outreach state of a sourced lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Contacted,
    Responded,
    Converted,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Responded => "responded",
            Self::Converted => "converted",
        }
    }
}

impl FromStr for LeadStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "contacted" => Ok(Self::Contacted),
            "responded" => Ok(Self::Responded),
            "converted" => Ok(Self::Converted),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// A sourced prospect attached to a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    /// Public UUID.
    pub id: String,
    pub campaign_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    /// Fit score 0–100 from lead scoring.
    pub score: u8,
    /// One-sentence justification written by the scoring pass.
    pub score_reason: Option<String>,
    pub status: LeadStatus,
    pub created_at: String,
}

/// Parameters for creating a lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLead {
    pub campaign_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub score: u8,
}

/// A record of one outbound call, keyed by the provider-assigned call SID.
///
/// `status` carries the telephony provider's status vocabulary verbatim
/// (initiated, ringing, answered, completed, failed, busy, no-answer, ...).
/// It is kept as a string so new provider statuses pass through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallLog {
    /// Internal database id.
    pub id: i64,
    pub call_sid: String,
    pub campaign_id: Option<String>,
    pub lead_id: Option<String>,
    pub phone_number: String,
    pub status: String,
    pub duration_secs: Option<u32>,
    pub recording_url: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
}

/// Parameters for inserting a call log at call-initiation time.
#[derive(Debug, Clone)]
pub struct NewCallLog {
    pub call_sid: String,
    pub campaign_id: Option<String>,
    pub lead_id: Option<String>,
    pub phone_number: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaign_status_round_trips_through_strings() {
        for status in [
            CampaignStatus::Draft,
            CampaignStatus::Active,
            CampaignStatus::Paused,
            CampaignStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<CampaignStatus>().unwrap(), status);
        }
        assert!("archived".parse::<CampaignStatus>().is_err());
    }

    #[test]
    fn lead_status_round_trips_through_strings() {
        for status in [
            LeadStatus::New,
            LeadStatus::Contacted,
            LeadStatus::Responded,
            LeadStatus::Converted,
        ] {
            assert_eq!(status.as_str().parse::<LeadStatus>().unwrap(), status);
        }
    }
}
