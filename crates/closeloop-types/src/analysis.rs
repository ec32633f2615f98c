//! Live-analysis verdict types.

use serde::{Deserialize, Serialize};

/// Sentiment classification for the conversation so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// The model's structured read on deal likelihood, produced fresh per
/// transcript fragment. Never persisted — the dashboard keeps only the
/// most recent verdict.
///
/// Every field has a neutral default so a partially well-formed model reply
/// still deserializes into a usable verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisVerdict {
    /// Estimated likelihood (0–100) that the prospect converts.
    #[serde(default = "default_confidence")]
    pub confidence_score: u8,
    #[serde(default = "default_sentiment")]
    pub sentiment: Sentiment,
    /// Buying signals or objections, as short bullet strings.
    #[serde(default = "default_signals")]
    pub signals: Vec<String>,
    /// One-line recommended next action for the sales agent.
    #[serde(default = "default_recommendation")]
    pub recommendation: String,
    /// One-line rationale for the score.
    #[serde(default = "default_reasoning")]
    pub reasoning: String,
}

fn default_confidence() -> u8 {
    50
}

fn default_sentiment() -> Sentiment {
    Sentiment::Neutral
}

fn default_signals() -> Vec<String> {
    vec!["Unable to analyze".to_string()]
}

fn default_recommendation() -> String {
    "Continue conversation".to_string()
}

fn default_reasoning() -> String {
    "Analysis incomplete".to_string()
}

impl AnalysisVerdict {
    /// The placeholder verdict returned when the model reply contains no
    /// extractable JSON object.
    pub fn neutral() -> Self {
        Self {
            confidence_score: default_confidence(),
            sentiment: default_sentiment(),
            signals: default_signals(),
            recommendation: default_recommendation(),
            reasoning: default_reasoning(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_uses_uppercase_wire_form() {
        assert_eq!(
            serde_json::to_string(&Sentiment::Positive).unwrap(),
            "\"POSITIVE\""
        );
        let parsed: Sentiment = serde_json::from_str("\"NEGATIVE\"").unwrap();
        assert_eq!(parsed, Sentiment::Negative);
    }

    #[test]
    fn verdict_fills_missing_fields_with_neutral_defaults() {
        let parsed: AnalysisVerdict =
            serde_json::from_str(r#"{"confidenceScore": 82, "sentiment": "POSITIVE"}"#).unwrap();
        assert_eq!(parsed.confidence_score, 82);
        assert_eq!(parsed.sentiment, Sentiment::Positive);
        assert_eq!(parsed.signals, vec!["Unable to analyze".to_string()]);
        assert_eq!(parsed.recommendation, "Continue conversation");
    }

    #[test]
    fn empty_object_parses_to_the_neutral_verdict() {
        let parsed: AnalysisVerdict = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, AnalysisVerdict::neutral());
    }
}
