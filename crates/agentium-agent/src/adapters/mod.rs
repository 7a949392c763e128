//! Built-in adapters for the supported coding-assistant CLIs.

mod aider;
mod claude_code;
mod codex;

pub use aider::AiderAdapter;
pub use claude_code::ClaudeCodeAdapter;
pub use codex::CodexAdapter;
