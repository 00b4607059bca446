//! Turns arbitrary LLM output text into a JSON value or a typed parse
//! failure. Pure function of its input; all failure paths are values.

use crate::errors::truncate;
use regex::Regex;
use std::sync::OnceLock;

const EXCERPT_MAX_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    pub reason: String,
    pub excerpt: String,
}

/// Ordered fallible parse attempts; first success wins. No attempt uses
/// errors for control flow — each returns `Option`.
pub fn normalize(raw: &str) -> Result<serde_json::Value, ParseFailure> {
    let attempts: [fn(&str) -> Option<serde_json::Value>; 3] =
        [attempt_direct, attempt_fenced, attempt_balanced_braces];

    for attempt in attempts {
        if let Some(value) = attempt(raw) {
            return Ok(value);
        }
    }

    Err(ParseFailure {
        reason: "no JSON payload found in response".to_string(),
        excerpt: truncate(raw, EXCERPT_MAX_CHARS),
    })
}

fn attempt_direct(raw: &str) -> Option<serde_json::Value> {
    serde_json::from_str(raw.trim()).ok()
}

fn fence_regexes() -> &'static (Regex, Regex) {
    static RE: OnceLock<(Regex, Regex)> = OnceLock::new();
    RE.get_or_init(|| {
        (
            Regex::new(r"(?s)```json\s*(.*?)```").expect("static regex"),
            Regex::new(r"(?s)```\s*(.*?)```").expect("static regex"),
        )
    })
}

/// A ```json fenced block wins over a generic ``` block.
fn attempt_fenced(raw: &str) -> Option<serde_json::Value> {
    let (json_fence, any_fence) = fence_regexes();
    for re in [json_fence, any_fence] {
        if let Some(caps) = re.captures(raw) {
            if let Some(inner) = caps.get(1) {
                if let Ok(value) = serde_json::from_str(inner.as_str().trim()) {
                    return Some(value);
                }
            }
        }
    }
    None
}

/// First outermost balanced `{ ... }` span, tracking string and escape state
/// so braces inside string literals do not affect depth.
fn attempt_balanced_braces(raw: &str) -> Option<serde_json::Value> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let span = &raw[start..start + offset + ch.len_utf8()];
                    return serde_json::from_str(span).ok();
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
    use serde_json::json;

    #[test]
    fn direct_json_parses() {
        assert_eq!(normalize(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
        assert_eq!(normalize("  [1, 2]  ").unwrap(), json!([1, 2]));
    }

    #[test]
    fn fenced_json_with_surrounding_prose() {
        let raw = "Here is the result:\n```json\n{\"a\":1}\n```";
        assert_eq!(normalize(raw).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn generic_fence_is_accepted() {
        let raw = "Sure!\n```\n{\"x\": true}\n```\nHope that helps.";
        assert_eq!(normalize(raw).unwrap(), json!({"x": true}));
    }

    #[test]
    fn bare_object_embedded_in_prose() {
        let raw = r#"The extracted data is {"name": "Ada", "note": "braces } in { strings"} as requested."#;
        assert_eq!(
            normalize(raw).unwrap(),
            json!({"name": "Ada", "note": "braces } in { strings"})
        );
    }

    #[test]
    fn refusal_text_is_a_parse_failure() {
        let err = normalize("I cannot help with that.").unwrap_err();
        assert_eq!(err.excerpt, "I cannot help with that.");
        assert!(err.reason.contains("no JSON"));
    }

    #[test]
    fn excerpt_is_bounded() {
        let raw = "x".repeat(5000);
        let err = normalize(&raw).unwrap_err();
        assert_eq!(err.excerpt.chars().count(), 1000);
    }

    #[test]
    fn fenced_block_wins_over_later_brace_span() {
        let raw = "```json\n{\"a\":1}\n```\ntrailing {\"b\":2}";
        assert_eq!(normalize(raw).unwrap(), json!({"a": 1}));
    }
}
