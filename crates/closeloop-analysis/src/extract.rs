//! Balanced-JSON-object extraction from model reply prose.

/// Returns the first well-formed JSON object embedded in `text`, if any.
///
/// The scan is string- and escape-aware: braces inside JSON string literals
/// do not affect nesting depth. Returns the exact source slice, which the
/// caller then deserializes.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_object_embedded_in_prose() {
        let reply = r#"Here is my analysis:

{"confidenceScore": 75, "sentiment": "POSITIVE"}

Let me know if you need more detail."#;
        assert_eq!(
            first_json_object(reply),
            Some(r#"{"confidenceScore": 75, "sentiment": "POSITIVE"}"#)
        );
    }

    #[test]
    fn braces_inside_strings_do_not_break_nesting() {
        let reply = r#"{"reasoning": "prospect said \"call me {later}\"", "confidenceScore": 60}"#;
        assert_eq!(first_json_object(reply), Some(reply));
    }

    #[test]
    fn nested_objects_are_captured_whole() {
        let reply = r#"prefix {"a": {"b": 1}, "c": 2} suffix"#;
        assert_eq!(first_json_object(reply), Some(r#"{"a": {"b": 1}, "c": 2}"#));
    }

    #[test]
    fn no_object_yields_none() {
        assert_eq!(first_json_object("no json here"), None);
        assert_eq!(first_json_object("unterminated { object"), None);
        assert_eq!(first_json_object(""), None);
    }
}
