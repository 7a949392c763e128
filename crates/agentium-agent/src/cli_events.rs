//! Mapping of Codex-style CLI events onto the unified event model.
//!
//! The CLI emits line-delimited JSON events: completed items by sub-type,
//! streaming text deltas, and error/turn-failure notices. Anything else
//! becomes a `system` event carrying the type as its summary; events with
//! neither content nor summary are skipped.

use crate::ndjson::StreamContext;
use agentium_core::{AgentEvent, EventKind};
use serde_json::Value;

/// Map one stream of CLI events onto unified agent events.
pub fn map_cli_events(stdout: &str, ctx: &StreamContext) -> Vec<AgentEvent> {
    let mut events = Vec::new();

    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        let Some(event_type) = value["type"].as_str() else {
            continue;
        };

        let event = match event_type {
            "item.completed" => map_completed_item(&value["item"], ctx),
            "item.delta" | "response.output_text.delta" => {
                let delta = value["delta"]
                    .as_str()
                    .or_else(|| value["text"].as_str())
                    .unwrap_or_default();
                Some(make(ctx, EventKind::Text, delta, delta))
            }
            "error" | "turn.failed" => {
                let message = value["message"]
                    .as_str()
                    .or_else(|| value["error"]["message"].as_str())
                    .unwrap_or_default();
                Some(make(ctx, EventKind::Error, message, message))
            }
            other => {
                let content = value.to_string();
                Some(make(ctx, EventKind::System, other, &content))
            }
        };

        if let Some(event) = event {
            if !event.is_empty() {
                events.push(event);
            }
        }
    }

    events
}

fn map_completed_item(item: &Value, ctx: &StreamContext) -> Option<AgentEvent> {
    match item["type"].as_str()? {
        "agent_message" => {
            let text = item["text"].as_str().unwrap_or_default();
            Some(make(ctx, EventKind::Text, text, text))
        }
        "command_execution" => {
            let command = item["command"].as_str().unwrap_or_default();
            let mut event = make(ctx, EventKind::Command, command, command);
            if let Some(exit_code) = item["exit_code"].as_i64() {
                event = event.with_metadata("exit_code", Value::from(exit_code));
            }
            if let Some(output) = item["aggregated_output"].as_str() {
                event = event.with_metadata("output", Value::String(output.to_string()));
            }
            Some(event)
        }
        "file_change" => {
            let path = item["path"]
                .as_str()
                .or_else(|| item["file"].as_str())
                .unwrap_or_default();
            let mut event = make(ctx, EventKind::FileChange, path, path);
            if let Some(kind) = item["kind"].as_str() {
                event = event.with_metadata("change_kind", Value::String(kind.to_string()));
            }
            Some(event)
        }
        other => {
            let content = item.to_string();
            Some(make(ctx, EventKind::System, other, &content))
        }
    }
}

fn make(ctx: &StreamContext, kind: EventKind, summary: &str, content: &str) -> AgentEvent {
    AgentEvent::new(
        ctx.session_id,
        ctx.iteration,
        ctx.adapter_name.clone(),
        kind,
        summary,
        content,
    )
}
