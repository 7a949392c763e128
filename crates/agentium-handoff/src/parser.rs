//! Extraction of `AGENTIUM_HANDOFF:` JSON payloads from agent stdout.
//!
//! The payload may span multiple lines and may contain braces inside string
//! literals, so extraction walks the byte stream tracking brace depth with
//! string and escape state rather than matching on lines.

use agentium_core::{AgentiumError, AgentiumResult};
use serde::de::DeserializeOwned;

const HANDOFF_PREFIX: &str = "AGENTIUM_HANDOFF:";

/// Extract the first hand-off JSON object from arbitrary agent stdout.
///
/// Returns the exact JSON substring, or `None` when no complete signal is
/// present.
pub fn extract_handoff_signal(stdout: &str) -> Option<&str> {
    let start = stdout.find(HANDOFF_PREFIX)?;
    let after = &stdout[start + HANDOFF_PREFIX.len()..];
    object_bounds(after).map(|(open, close)| &after[open..close])
}

/// Extract every hand-off JSON object from the stream, in order of
/// appearance. Incomplete trailing signals are skipped.
pub fn extract_all_handoff_signals(stdout: &str) -> Vec<&str> {
    let mut signals = Vec::new();
    let mut rest = stdout;
    while let Some(pos) = rest.find(HANDOFF_PREFIX) {
        let after = &rest[pos + HANDOFF_PREFIX.len()..];
        match object_bounds(after) {
            Some((open, close)) => {
                signals.push(&after[open..close]);
                rest = &after[close..];
            }
            None => break,
        }
    }
    signals
}

/// Extract and deserialize the first hand-off signal into a typed output.
pub fn parse_handoff<T: DeserializeOwned>(stdout: &str) -> AgentiumResult<Option<T>> {
    let Some(json) = extract_handoff_signal(stdout) else {
        return Ok(None);
    };
    let parsed = serde_json::from_str(json)
        .map_err(|e| AgentiumError::Handoff(format!("invalid hand-off JSON: {e}")))?;
    Ok(Some(parsed))
}

/// Locate a JSON object from the first `{`, tracking brace depth with
/// string and escape state so that braces inside string literals do not
/// count. Returns the byte range `[open, close)` of the object.
fn object_bounds(input: &str) -> Option<(usize, usize)> {
    let open = input.find('{')?;

    // Only whitespace may sit between the prefix and the opening brace.
    if !input[..open].chars().all(char::is_whitespace) {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in input.as_bytes().iter().enumerate().skip(open) {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some((open, i + 1));
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
    use crate::types::PlanOutput;

    #[test]
    fn extracts_exact_json_substring() {
        let stdout = concat!(
            "doing some work\n",
            "AGENTIUM_HANDOFF: {\"summary\":\"s\",\"files_to_modify\":[\"a\"],",
            "\"files_to_create\":[],\"implementation_steps\":",
            "[{\"order\":1,\"description\":\"d\"}],\"testing_approach\":\"t\"}\n",
            "AGENTIUM_STATUS: COMPLETE\n",
        );
        let json = extract_handoff_signal(stdout).unwrap();
        assert!(json.starts_with('{'));
        assert!(json.ends_with('}'));
        let plan: PlanOutput = serde_json::from_str(json).unwrap();
        assert_eq!(plan.summary, "s");
        assert!(plan.files_to_modify.contains("a"));
    }

    #[test]
    fn braces_inside_strings_do_not_count() {
        let stdout = r#"AGENTIUM_HANDOFF: {"summary":"use {braces} and \"quotes\"","note":"}{"}"#;
        let json = extract_handoff_signal(stdout).unwrap();
        assert_eq!(
            json,
            r#"{"summary":"use {braces} and \"quotes\"","note":"}{"}"#
        );
    }

    #[test]
    fn escaped_quote_before_brace() {
        let stdout = r#"AGENTIUM_HANDOFF: {"k":"a\\","b":"{"}"#;
        let json = extract_handoff_signal(stdout).unwrap();
        assert_eq!(json, r#"{"k":"a\\","b":"{"}"#);
    }

    #[test]
    fn multiline_object() {
        let stdout = "AGENTIUM_HANDOFF: {\n  \"branch_name\": \"feat/x\",\n  \"tests_passed\": true,\n  \"files_changed\": [\"x.go\"]\n}\ntrailing";
        let json = extract_handoff_signal(stdout).unwrap();
        assert!(json.contains("feat/x"));
        assert!(json.ends_with('}'));
    }

    #[test]
    fn no_signal_returns_none() {
        assert!(extract_handoff_signal("just text").is_none());
        assert!(parse_handoff::<PlanOutput>("just text").unwrap().is_none());
    }

    #[test]
    fn unterminated_object_returns_none() {
        assert!(extract_handoff_signal("AGENTIUM_HANDOFF: {\"a\": 1").is_none());
    }

    #[test]
    fn garbage_between_prefix_and_brace_rejected() {
        assert!(extract_handoff_signal("AGENTIUM_HANDOFF: see below {\"a\":1}").is_none());
    }

    #[test]
    fn all_signals_in_order() {
        let stdout = "AGENTIUM_HANDOFF: {\"a\":1}\nnoise\nAGENTIUM_HANDOFF: {\"b\":{\"c\":2}}\n";
        let all = extract_all_handoff_signals(stdout);
        assert_eq!(all, vec!["{\"a\":1}", "{\"b\":{\"c\":2}}"]);
    }

    #[test]
    fn parse_handoff_invalid_json_is_error() {
        let stdout = "AGENTIUM_HANDOFF: {\"summary\": }";
        // Balanced braces but invalid JSON: extraction succeeds, parse fails.
        assert!(parse_handoff::<PlanOutput>(stdout).is_err());
    }
}
