//! Batch lead scoring: one model round trip per lead.
//!
//! Unlike the live verdict, the scoring reply is line-oriented rather than
//! JSON — the model is told to answer with exactly a `SCORE:` line and a
//! `REASON:` line, and anything it garbles degrades to a neutral score so
//! one bad reply cannot fail a whole campaign pass.

use crate::engine::{AnalysisEngine, AnalysisError};
use closeloop_types::{Campaign, Lead};

/// Reply budget for a scoring round trip: two short lines.
const SCORING_MAX_TOKENS: u32 = 200;

/// Neutral fallback when the reply carries no parseable score.
const DEFAULT_SCORE: u8 = 50;

const DEFAULT_REASON: &str = "Lead profile needs more information for accurate scoring";

/// A fit score with its one-sentence justification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadScore {
    /// 0–100.
    pub score: u8,
    pub reason: String,
}

impl AnalysisEngine {
    /// Scores one lead against its campaign.
    ///
    /// Returns the parsed score and reason; a malformed reply degrades to
    /// the neutral default. Configuration and transport/API failures
    /// surface as errors and the caller decides how to degrade.
    pub async fn score_lead(
        &self,
        campaign: &Campaign,
        lead: &Lead,
    ) -> Result<LeadScore, AnalysisError> {
        let prompt = render_scoring_prompt(campaign, lead);
        let text = self.complete(&prompt, SCORING_MAX_TOKENS).await?;
        Ok(score_from_reply(&text))
    }
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("Not provided")
}

fn render_scoring_prompt(campaign: &Campaign, lead: &Lead) -> String {
    format!(
        r#"You are a lead scoring expert. Analyze this lead against the campaign details and provide a fit score (0-100) and reasoning.

Campaign Details:
- Name: {campaign_name}
- Company: {campaign_company}
- Product: {product}
- Target audience: {audience}

Lead Profile:
- Name: {lead_name}
- Email: {email}
- Phone: {phone}
- Company: {lead_company}
- Title: {title}

Analyze this lead's fit for the campaign. Consider:
1. Job title/role relevance to the campaign
2. Company/industry alignment
3. Decision-making authority
4. Contact information completeness

Respond in this EXACT format (no other text):
SCORE: [number 0-100]
REASON: [one concise sentence explaining the score]"#,
        campaign_name = campaign.name,
        campaign_company = campaign.company,
        product = field(&campaign.product_description),
        audience = field(&campaign.target_audience),
        lead_name = lead.name,
        email = field(&lead.email),
        phone = field(&lead.phone),
        lead_company = field(&lead.company),
        title = field(&lead.title),
    )
}

/// Parses the `SCORE:` / `REASON:` lines out of the reply. The first
/// occurrence of each wins; a missing or unparseable line falls back to
/// the neutral default, and out-of-range scores are clamped.
fn score_from_reply(text: &str) -> LeadScore {
    let mut score = None;
    let mut reason = None;
    for line in text.lines() {
        let line = line.trim();
        if score.is_none() {
            if let Some(rest) = line.strip_prefix("SCORE:") {
                let digits: String = rest
                    .trim_start()
                    .chars()
                    .take_while(char::is_ascii_digit)
                    .collect();
                score = digits.parse::<u64>().ok().map(|n| n.min(100) as u8);
            }
        }
        if reason.is_none() {
            if let Some(rest) = line.strip_prefix("REASON:") {
                let rest = rest.trim();
                if !rest.is_empty() {
                    reason = Some(rest.to_string());
                }
            }
        }
    }

    if score.is_none() {
        tracing::debug!("no parseable score in reply; using neutral default");
    }
    LeadScore {
        score: score.unwrap_or(DEFAULT_SCORE),
        reason: reason.unwrap_or_else(|| DEFAULT_REASON.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use closeloop_types::{CampaignStatus, LeadStatus};

    fn campaign() -> Campaign {
        Campaign {
            id: "camp-1".to_string(),
            name: "Q3 Launch".to_string(),
            company: "Acme".to_string(),
            product_description: Some("Industrial widgets".to_string()),
            target_audience: None,
            status: CampaignStatus::Active,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn lead() -> Lead {
        Lead {
            id: "lead-1".to_string(),
            campaign_id: "camp-1".to_string(),
            name: "Grace".to_string(),
            email: Some("grace@example.com".to_string()),
            phone: None,
            company: Some("Hopper Inc".to_string()),
            title: Some("VP Engineering".to_string()),
            score: 0,
            score_reason: None,
            status: LeadStatus::New,
            created_at: "2026-01-02T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn prompt_carries_campaign_and_lead_fields() {
        let prompt = render_scoring_prompt(&campaign(), &lead());
        assert!(prompt.contains("Name: Q3 Launch"));
        assert!(prompt.contains("Product: Industrial widgets"));
        assert!(prompt.contains("Target audience: Not provided"));
        assert!(prompt.contains("Name: Grace"));
        assert!(prompt.contains("Title: VP Engineering"));
        assert!(prompt.contains("Phone: Not provided"));
        assert!(prompt.contains("SCORE: [number 0-100]"));
    }

    #[test]
    fn well_formed_reply_parses_score_and_reason() {
        let parsed = score_from_reply("SCORE: 85\nREASON: Senior decision maker at a target-fit company.");
        assert_eq!(parsed.score, 85);
        assert_eq!(
            parsed.reason,
            "Senior decision maker at a target-fit company."
        );
    }

    #[test]
    fn reply_wrapped_in_prose_still_parses() {
        let parsed = score_from_reply(
            "Here is my assessment:\n\nSCORE: 72\nREASON: Relevant title but no phone contact.\nLet me know if you need more.",
        );
        assert_eq!(parsed.score, 72);
        assert_eq!(parsed.reason, "Relevant title but no phone contact.");
    }

    #[test]
    fn missing_lines_fall_back_to_neutral_defaults() {
        let parsed = score_from_reply("I cannot score this lead.");
        assert_eq!(parsed.score, 50);
        assert_eq!(
            parsed.reason,
            "Lead profile needs more information for accurate scoring"
        );
    }

    #[test]
    fn out_of_range_score_is_clamped() {
        let parsed = score_from_reply("SCORE: 250\nREASON: Overenthusiastic.");
        assert_eq!(parsed.score, 100);
    }

    #[test]
    fn unparseable_score_keeps_the_parsed_reason() {
        let parsed = score_from_reply("SCORE: very high\nREASON: Strong fit.");
        assert_eq!(parsed.score, 50);
        assert_eq!(parsed.reason, "Strong fit.");
    }

    #[test]
    fn first_occurrence_of_each_line_wins() {
        let parsed = score_from_reply("SCORE: 60\nREASON: First.\nSCORE: 10\nREASON: Second.");
        assert_eq!(parsed.score, 60);
        assert_eq!(parsed.reason, "First.");
    }
}
