//! The live analysis engine: one bounded model round trip per fragment.

use crate::config::AnalysisConfig;
use crate::extract::first_json_object;
use closeloop_types::{AnalysisVerdict, Speaker};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Hard ceiling on the analysis round trip. The verdict is on the critical
/// path of the dashboard's perceived "live" score.
const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Most recent turns of history included in the prompt.
const HISTORY_WINDOW: usize = 40;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Missing credentials — requires operator action, not a retry.
    #[error("analysis configuration error: {0}")]
    Config(String),

    #[error("language model API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("language model request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// One prior turn of the conversation, as the browser submits it.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
pub struct HistoryTurn {
    pub speaker: Speaker,
    pub text: String,
}

/// A request to analyze one new transcript fragment in context.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub transcript: String,
    pub speaker: Speaker,
    #[serde(default)]
    pub conversation_history: Vec<HistoryTurn>,
}

#[derive(Debug, Deserialize)]
struct MessagesReply {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Client for per-fragment sentiment/confidence analysis.
#[derive(Debug, Clone)]
pub struct AnalysisEngine {
    http: reqwest::Client,
    config: AnalysisConfig,
}

impl AnalysisEngine {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Whether the engine has credentials to make model requests.
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Runs one analysis round trip and returns a verdict.
    ///
    /// Always produces a verdict when the model replies at all: a reply with
    /// no extractable JSON object degrades to the neutral default. Only
    /// configuration and transport/API failures surface as errors — those
    /// are synchronous, user-initiated requests and the caller shows them.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisVerdict, AnalysisError> {
        let prompt = render_prompt(request);
        let text = self.complete(&prompt, self.config.max_tokens).await?;
        Ok(verdict_from_reply(&text))
    }

    /// One Messages API round trip; returns the first text block of the
    /// reply, or empty when the reply carries none.
    pub(crate) async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, AnalysisError> {
        if !self.config.is_configured() {
            return Err(AnalysisError::Config("missing api_key".to_string()));
        }

        let response = self
            .http
            .post(format!("{}/v1/messages", self.config.api_base))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&json!({
                "model": self.config.model,
                "max_tokens": max_tokens,
                "messages": [{ "role": "user", "content": prompt }],
            }))
            .timeout(API_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let reply: MessagesReply = response.json().await?;
        Ok(reply
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text)
            .unwrap_or_default())
    }
}

/// Renders the analysis prompt: the bounded history window, the new
/// fragment, and the verdict schema the model must fill in.
fn render_prompt(request: &AnalysisRequest) -> String {
    let mut context = String::new();
    let start = request
        .conversation_history
        .len()
        .saturating_sub(HISTORY_WINDOW);
    for turn in &request.conversation_history[start..] {
        context.push_str(&format!("{}: {}\n", speaker_label(turn.speaker), turn.text));
    }
    context.push_str(&format!(
        "{}: {}",
        speaker_label(request.speaker),
        request.transcript
    ));

    format!(
        r#"You are analyzing a sales call in real-time.
Based on the following conversation, provide:
1. Confidence Score (0-100): How likely is the prospect to convert?
2. Sentiment: POSITIVE, NEUTRAL, or NEGATIVE
3. Key Signals: Brief bullet points of buying signals or objections
4. Recommendation: What should the sales agent do next?

Conversation:
{context}

Respond in JSON format:
{{
  "confidenceScore": number (0-100),
  "sentiment": "POSITIVE" | "NEUTRAL" | "NEGATIVE",
  "signals": ["signal1", "signal2"],
  "recommendation": "brief recommendation",
  "reasoning": "brief explanation"
}}"#
    )
}

fn speaker_label(speaker: Speaker) -> &'static str {
    match speaker {
        Speaker::Agent => "agent",
        Speaker::Prospect => "prospect",
    }
}

/// Extracts the verdict from the model's reply text, falling back to the
/// neutral default when no well-formed JSON object is present.
fn verdict_from_reply(text: &str) -> AnalysisVerdict {
    let Some(object) = first_json_object(text) else {
        tracing::debug!("no JSON object in analysis reply; returning neutral verdict");
        return AnalysisVerdict::neutral();
    };
    match serde_json::from_str::<AnalysisVerdict>(object) {
        Ok(mut verdict) => {
            verdict.confidence_score = verdict.confidence_score.min(100);
            verdict
        }
        Err(e) => {
            tracing::debug!(error = %e, "analysis reply JSON did not match verdict schema");
            AnalysisVerdict::neutral()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use closeloop_types::Sentiment;

    fn request_with_history(turns: usize) -> AnalysisRequest {
        AnalysisRequest {
            transcript: "What does pricing look like?".to_string(),
            speaker: Speaker::Prospect,
            conversation_history: (0..turns)
                .map(|i| HistoryTurn {
                    speaker: if i % 2 == 0 {
                        Speaker::Agent
                    } else {
                        Speaker::Prospect
                    },
                    text: format!("turn {i}"),
                })
                .collect(),
        }
    }

    #[test]
    fn prompt_includes_history_and_new_fragment() {
        let prompt = render_prompt(&request_with_history(2));
        assert!(prompt.contains("agent: turn 0"));
        assert!(prompt.contains("prospect: turn 1"));
        assert!(prompt.contains("prospect: What does pricing look like?"));
        assert!(prompt.contains("Respond in JSON format"));
    }

    #[test]
    fn prompt_history_window_is_bounded() {
        let prompt = render_prompt(&request_with_history(100));
        // Only the most recent HISTORY_WINDOW turns survive.
        assert!(!prompt.contains("turn 59"));
        assert!(prompt.contains("turn 60"));
        assert!(prompt.contains("turn 99"));
    }

    #[test]
    fn verdict_extracted_from_prose_wrapped_reply() {
        let verdict = verdict_from_reply(
            "Sure — here's the analysis:\n\
             {\"confidenceScore\": 85, \"sentiment\": \"POSITIVE\", \
              \"signals\": [\"asked about pricing\"], \
              \"recommendation\": \"Offer a demo\", \"reasoning\": \"Strong intent\"}\n\
             Hope that helps!",
        );
        assert_eq!(verdict.confidence_score, 85);
        assert_eq!(verdict.sentiment, Sentiment::Positive);
        assert_eq!(verdict.signals, vec!["asked about pricing".to_string()]);
    }

    #[test]
    fn reply_without_json_degrades_to_neutral() {
        let verdict = verdict_from_reply("I could not analyze this conversation.");
        assert_eq!(verdict, AnalysisVerdict::neutral());
        assert_eq!(verdict.confidence_score, 50);
        assert_eq!(verdict.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let verdict = verdict_from_reply(r#"{"confidenceScore": 150}"#);
        assert_eq!(verdict.confidence_score, 100);
    }

    #[test]
    fn mistyped_verdict_fields_degrade_to_neutral() {
        let verdict = verdict_from_reply(r#"{"confidenceScore": "very high"}"#);
        assert_eq!(verdict, AnalysisVerdict::neutral());
    }
}
