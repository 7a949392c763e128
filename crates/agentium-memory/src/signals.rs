//! Parsing of `AGENTIUM_MEMORY:` lines from agent stdout.

use crate::types::{ParsedSignal, SignalType};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

#[allow(clippy::unwrap_used)]
static MEMORY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^AGENTIUM_MEMORY:[ \t]+([A-Z_]+)[ \t]+(.+)$").unwrap());

/// Extract every memory signal from agent stdout, in order of appearance.
/// Lines with unknown signal types are dropped.
pub fn parse_memory_signals(stdout: &str) -> Vec<ParsedSignal> {
    MEMORY_RE
        .captures_iter(stdout)
        .filter_map(|caps| {
            let Some(signal_type) = SignalType::from_name(&caps[1]) else {
                debug!(name = &caps[1], "Dropping memory signal with unknown type");
                return None;
            };
            Some(ParsedSignal {
                signal_type,
                content: caps[2].trim().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_signals_in_order() {
        let out = "AGENTIUM_MEMORY: KEY_FACT uses pnpm workspaces\n\
                   noise line\n\
                   AGENTIUM_MEMORY: STEP_DONE wrote parser\n";
        let signals = parse_memory_signals(out);
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].signal_type, SignalType::KeyFact);
        assert_eq!(signals[0].content, "uses pnpm workspaces");
        assert_eq!(signals[1].signal_type, SignalType::StepDone);
    }

    #[test]
    fn unknown_types_dropped() {
        let out = "AGENTIUM_MEMORY: GOSSIP irrelevant\nAGENTIUM_MEMORY: ERROR build failed\n";
        let signals = parse_memory_signals(out);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].signal_type, SignalType::Error);
    }

    #[test]
    fn signal_must_start_the_line() {
        let out = "prefix AGENTIUM_MEMORY: KEY_FACT hidden\n";
        assert!(parse_memory_signals(out).is_empty());
    }

    #[test]
    fn content_is_required() {
        let out = "AGENTIUM_MEMORY: KEY_FACT\n";
        assert!(parse_memory_signals(out).is_empty());
    }
}
