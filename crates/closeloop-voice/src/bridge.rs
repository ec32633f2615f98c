//! Control-document extraction from voice-platform replies.
//!
//! The register-call endpoint has been observed to answer in two shapes:
//! raw TwiML, or a JSON envelope carrying the TwiML under one of several
//! field names. Detection is ordered: markup first, then the JSON field
//! names in priority order, then fail closed as malformed.

use crate::error::VoiceAgentError;

/// JSON field names known to carry the TwiML document, in priority order.
const TWIML_FIELDS: &[&str] = &["twiml", "twiml_response", "response"];

/// Extracts the TwiML call-control document from an upstream reply body.
pub fn parse_control_document(body: &str) -> Result<String, VoiceAgentError> {
    let trimmed = body.trim();

    // Shape 1: raw markup.
    if trimmed.starts_with('<') {
        return Ok(trimmed.to_string());
    }

    // Shape 2: JSON envelope with a TwiML-bearing field.
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for field in TWIML_FIELDS {
            if let Some(document) = value.get(field).and_then(|v| v.as_str()) {
                if document.trim_start().starts_with('<') {
                    return Ok(document.trim().to_string());
                }
            }
        }
    }

    // Shape 3: neither — fail closed.
    Err(VoiceAgentError::MalformedResponse(format!(
        "reply is neither markup nor a JSON envelope with one of {:?}",
        TWIML_FIELDS
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = "<Response><Connect><Stream url=\"wss://x\"/></Connect></Response>";

    #[test]
    fn raw_markup_passes_through() {
        assert_eq!(parse_control_document(DOCUMENT).unwrap(), DOCUMENT);
        // Leading whitespace is tolerated.
        assert_eq!(
            parse_control_document(&format!("\n  {DOCUMENT}")).unwrap(),
            DOCUMENT
        );
    }

    #[test]
    fn each_known_envelope_field_is_recognized() {
        for field in ["twiml", "twiml_response", "response"] {
            let body = serde_json::json!({ field: DOCUMENT }).to_string();
            assert_eq!(parse_control_document(&body).unwrap(), DOCUMENT);
        }
    }

    #[test]
    fn field_priority_order_is_stable() {
        let body = serde_json::json!({
            "response": "<Response><Hangup/></Response>",
            "twiml": DOCUMENT,
        })
        .to_string();
        assert_eq!(parse_control_document(&body).unwrap(), DOCUMENT);
    }

    #[test]
    fn non_markup_field_values_do_not_match() {
        let body = serde_json::json!({ "twiml": "not markup" }).to_string();
        assert!(matches!(
            parse_control_document(&body),
            Err(VoiceAgentError::MalformedResponse(_))
        ));
    }

    #[test]
    fn unrecognized_shapes_fail_closed() {
        for body in [
            "plain text",
            r#"{"unexpected": "shape"}"#,
            r#"["array"]"#,
            "",
        ] {
            assert!(matches!(
                parse_control_document(body),
                Err(VoiceAgentError::MalformedResponse(_))
            ));
        }
    }
}
