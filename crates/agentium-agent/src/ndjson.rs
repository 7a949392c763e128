//! NDJSON stream parsing for Claude-Code-style agent output.
//!
//! The CLI emits one JSON object per line. Malformed lines are skipped
//! without losing subsequent valid ones. `assistant`/`user` messages carry
//! content blocks; the final `result` line carries usage and stop reason.

use crate::result::TokenUsage;
use agentium_core::{AgentEvent, EventKind};
use serde_json::Value;
use uuid::Uuid;

/// Cap on retained thinking content, in bytes.
pub const THINKING_CAP_BYTES: usize = 50_000;

/// Identity of the stream being parsed, stamped onto every event.
#[derive(Debug, Clone)]
pub struct StreamContext {
    pub session_id: Uuid,
    pub iteration: u32,
    pub adapter_name: String,
}

/// Everything extracted from one NDJSON stream.
#[derive(Debug, Default)]
pub struct NdjsonParse {
    pub events: Vec<AgentEvent>,
    pub usage: Option<TokenUsage>,
    pub stop_reason: Option<String>,
    pub result_text: Option<String>,
    pub is_error: bool,
}

/// Parse a full NDJSON stream. Never panics; malformed lines yield exactly
/// the events extractable from the well-formed ones.
pub fn parse_ndjson(stdout: &str, ctx: &StreamContext) -> NdjsonParse {
    let mut parse = NdjsonParse::default();

    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(line) else {
            continue;
        };

        match value["type"].as_str() {
            Some("assistant") | Some("user") => {
                collect_content_blocks(&value["message"]["content"], ctx, &mut parse.events);
            }
            Some("result") => {
                parse.is_error = value["is_error"].as_bool().unwrap_or(false);
                parse.result_text = value["result"].as_str().map(ToString::to_string);
                parse.stop_reason = value["stop_reason"]
                    .as_str()
                    .or_else(|| value["subtype"].as_str())
                    .map(ToString::to_string);
                let usage = &value["usage"];
                if usage.is_object() {
                    parse.usage = Some(TokenUsage {
                        input_tokens: usage["input_tokens"].as_u64().unwrap_or(0),
                        output_tokens: usage["output_tokens"].as_u64().unwrap_or(0),
                    });
                }
            }
            _ => {}
        }
    }

    parse.events.retain(|e| !e.is_empty());
    parse
}

fn collect_content_blocks(content: &Value, ctx: &StreamContext, events: &mut Vec<AgentEvent>) {
    let Some(blocks) = content.as_array() else {
        return;
    };

    for block in blocks {
        match block["type"].as_str() {
            Some("text") => {
                let text = block["text"].as_str().unwrap_or_default();
                events.push(make_event(ctx, EventKind::Text, text, text));
            }
            Some("thinking") => {
                let thinking = block["thinking"].as_str().unwrap_or_default();
                let truncated = truncate_bytes(thinking, THINKING_CAP_BYTES);
                events.push(make_event(ctx, EventKind::Thinking, truncated, truncated));
            }
            Some("tool_use") => {
                let name = block["name"].as_str().unwrap_or_default();
                let input = block["input"].to_string();
                let mut event = make_event(ctx, EventKind::ToolUse, name, &input);
                if let Some(id) = block["id"].as_str() {
                    event = event.with_metadata("tool_use_id", Value::String(id.to_string()));
                }
                if let Some(path) = block["input"]["file_path"].as_str() {
                    event = event.with_metadata("file_path", Value::String(path.to_string()));
                }
                events.push(event);
            }
            Some("tool_result") => {
                let text = join_content_text(&block["content"]);
                let mut event = make_event(ctx, EventKind::ToolResult, &text, &text);
                if let Some(id) = block["tool_use_id"].as_str() {
                    event = event.with_metadata("tool_use_id", Value::String(id.to_string()));
                }
                events.push(event);
            }
            _ => {}
        }
    }
}

/// A content field may be a plain string or an array of blocks; arrays are
/// joined by newline over their per-item `text` fields.
fn join_content_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item["text"].as_str())
            .collect::<Vec<&str>>()
            .join("\n"),
        _ => String::new(),
    }
}

fn make_event(ctx: &StreamContext, kind: EventKind, summary: &str, content: &str) -> AgentEvent {
    AgentEvent::new(
        ctx.session_id,
        ctx.iteration,
        ctx.adapter_name.clone(),
        kind,
        summary,
        content,
    )
}

fn truncate_bytes(s: &str, cap: usize) -> &str {
    if s.len() <= cap {
        return s;
    }
    let mut end = cap;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
