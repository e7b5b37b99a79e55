use serde_json::Value;
use tracing::{debug, warn};

/// How many stringified-response lines the keyword fallback may return.
const KEYWORD_SCAN_LINE_CAP: usize = 10;

/// Extract a human-readable answer from the raw agent reply.
///
/// The reply is a closed set of known shapes probed in a fixed order:
/// structured text messages, the legacy flat fulfillment text, the nested
/// fulfillment-response messages, then the keyword heuristic. The first
/// strategy that yields text wins. Each path is read leniently on its own;
/// an unexpected type in one field never discards text carried by another.
/// Message and line order is preserved exactly as the service returned it;
/// nothing is deduplicated. `None` means the reply is well-formed but
/// carries no usable text, which is not an error.
///
/// Both the REST camelCase spelling and the snake_case one are accepted.
pub fn extract_answer(raw: &Value, keywords: &[String]) -> Option<String> {
    if let Some(result) = field(raw, &["queryResult", "query_result"]) {
        let strategies: &[fn(&Value) -> Option<String>] = &[
            from_response_messages,
            from_fulfillment_text,
            from_fulfillment_response,
        ];

        for strategy in strategies {
            if let Some(answer) = strategy(result) {
                return Some(answer);
            }
        }

        if let Some(intent) = field(result, &["intent"])
            .and_then(|i| field(i, &["displayName", "display_name"]))
            .and_then(Value::as_str)
        {
            debug!("Matched intent: {intent}");
        }
    }

    from_keyword_scan(raw, keywords)
}

/// First present key wins; the spellings are aliases, not alternatives.
fn field<'a>(value: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| value.get(name))
}

fn from_response_messages(result: &Value) -> Option<String> {
    let messages = field(result, &["responseMessages", "response_messages"])?.as_array()?;
    collect_text_lines(messages)
}

fn from_fulfillment_text(result: &Value) -> Option<String> {
    let text = field(result, &["fulfillmentText", "fulfillment_text"])?.as_str()?;
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn from_fulfillment_response(result: &Value) -> Option<String> {
    let fulfillment = field(result, &["fulfillmentResponse", "fulfillment_response"])?;
    let messages = fulfillment.get("messages")?.as_array()?;
    collect_text_lines(messages)
}

/// Join the text lines of every text-variant message, in order. Non-text
/// variants and entries of unexpected type are skipped individually, never
/// at the expense of their siblings.
fn collect_text_lines(messages: &[Value]) -> Option<String> {
    let mut lines: Vec<String> = Vec::new();
    for message in messages {
        if let Some(text) = message.get("text") {
            let Some(entries) = text.get("text").and_then(Value::as_array) else {
                warn!("Text message without a line array: {text}");
                continue;
            };
            for entry in entries {
                match entry.as_str() {
                    Some(line) => lines.push(line.to_string()),
                    None => warn!("Skipping non-string text entry: {entry}"),
                }
            }
        } else if message.get("payload").is_some() {
            debug!("Skipping payload response message");
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Last-resort heuristic: stringify the whole reply and pull out lines
/// mentioning a configured keyword. Brittle and deployment-specific; kept
/// isolated here so it is trivial to remove.
fn from_keyword_scan(raw: &Value, keywords: &[String]) -> Option<String> {
    if keywords.is_empty() {
        return None;
    }

    let rendered = serde_json::to_string_pretty(raw).ok()?;
    for keyword in keywords {
        let needle = keyword.to_lowercase();
        let matching: Vec<&str> = rendered
            .lines()
            .filter(|line| line.to_lowercase().contains(&needle))
            .take(KEYWORD_SCAN_LINE_CAP)
            .collect();

        if !matching.is_empty() {
            debug!("Keyword fallback matched {} lines for '{keyword}'", matching.len());
            return Some(format!(
                "Information about {keyword}:\n{}",
                matching.join("\n")
            ));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_keywords() -> Vec<String> {
        Vec::new()
    }

    #[test]
    fn joins_text_entries_across_response_messages() {
        let raw = json!({
            "queryResult": {
                "responseMessages": [
                    {"text": {"text": ["A", "B"]}},
                    {"text": {"text": ["C"]}}
                ]
            }
        });
        assert_eq!(extract_answer(&raw, &no_keywords()).unwrap(), "A\nB\nC");
    }

    #[test]
    fn accepts_snake_case_field_names() {
        let raw = json!({
            "query_result": {
                "response_messages": [{"text": {"text": ["hi"]}}]
            }
        });
        assert_eq!(extract_answer(&raw, &no_keywords()).unwrap(), "hi");
    }

    #[test]
    fn payload_variants_are_ignored() {
        let raw = json!({
            "queryResult": {
                "responseMessages": [
                    {"payload": {"kind": "card"}},
                    {"text": {"text": ["only text survives"]}}
                ]
            }
        });
        assert_eq!(
            extract_answer(&raw, &no_keywords()).unwrap(),
            "only text survives"
        );
    }

    #[test]
    fn unexpected_sibling_type_does_not_discard_valid_text() {
        let raw = json!({
            "queryResult": {
                "responseMessages": [{"text": {"text": ["A"]}}],
                "intent": "unexpected-string-shape"
            }
        });
        assert_eq!(extract_answer(&raw, &no_keywords()).unwrap(), "A");
    }

    #[test]
    fn non_string_text_entries_are_skipped_individually() {
        let raw = json!({
            "queryResult": {
                "responseMessages": [{"text": {"text": ["A", 42, "B"]}}]
            }
        });
        assert_eq!(extract_answer(&raw, &no_keywords()).unwrap(), "A\nB");
    }

    #[test]
    fn malformed_message_does_not_discard_its_siblings() {
        let raw = json!({
            "queryResult": {
                "responseMessages": [
                    {"text": "not-an-object"},
                    {"text": {"text": ["still here"]}}
                ]
            }
        });
        assert_eq!(extract_answer(&raw, &no_keywords()).unwrap(), "still here");
    }

    #[test]
    fn falls_back_to_fulfillment_text() {
        let raw = json!({
            "queryResult": {
                "responseMessages": [],
                "fulfillmentText": "Hello"
            }
        });
        assert_eq!(extract_answer(&raw, &no_keywords()).unwrap(), "Hello");
    }

    #[test]
    fn response_messages_take_priority_over_fulfillment_text() {
        let raw = json!({
            "queryResult": {
                "responseMessages": [{"text": {"text": ["structured"]}}],
                "fulfillmentText": "legacy"
            }
        });
        assert_eq!(extract_answer(&raw, &no_keywords()).unwrap(), "structured");
    }

    #[test]
    fn reads_fulfillment_response_messages() {
        let raw = json!({
            "queryResult": {
                "fulfillmentResponse": {
                    "messages": [
                        {"text": {"text": ["first"]}},
                        {"text": {"text": ["second"]}}
                    ]
                }
            }
        });
        assert_eq!(
            extract_answer(&raw, &no_keywords()).unwrap(),
            "first\nsecond"
        );
    }

    #[test]
    fn empty_response_yields_none() {
        let raw = json!({"queryResult": {"responseMessages": []}});
        assert!(extract_answer(&raw, &no_keywords()).is_none());
    }

    #[test]
    fn keyword_scan_is_case_insensitive_and_capped() {
        let lines: Vec<String> = (0..15).map(|i| format!("circular item {i}")).collect();
        let raw = json!({"diagnosticInfo": {"snippets": lines}});

        let keywords = vec!["Circular".to_string()];
        let answer = extract_answer(&raw, &keywords).unwrap();

        assert!(answer.starts_with("Information about Circular:"));
        // Header plus at most ten matching lines.
        assert_eq!(answer.lines().count(), 11);
    }

    #[test]
    fn keyword_scan_preserves_line_order() {
        let raw = json!({"a": "topic one", "b": "topic two"});
        let keywords = vec!["topic".to_string()];
        let answer = extract_answer(&raw, &keywords).unwrap();
        let body: Vec<&str> = answer.lines().skip(1).collect();
        assert!(body[0].contains("topic one"));
        assert!(body[1].contains("topic two"));
    }
}
