/*
 * Quill - Sandboxed Autonomous Coding Agent
 * File Path: src/conversation.rs
 * Responsibility: Append-only conversation state shared with the oracle.
 */

use serde_json::Value;

/// A single tool invocation requested by the oracle. Arguments stay untyped
/// until the registry validates them against the tool's schema.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    pub name: String,
    pub args: Value,
}

/// The outcome of one tool call. Ownership moves into a `Turn::Tool`
/// immediately after execution; nothing else retains it.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub name: String,
    pub payload: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
            is_error: false,
        }
    }

    pub fn error(name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
            is_error: true,
        }
    }
}

/// One atomic addition to the conversation record.
#[derive(Debug, Clone)]
pub enum Turn {
    User {
        text: String,
    },
    Oracle {
        text: Option<String>,
        calls: Vec<ToolCallRequest>,
    },
    Tool {
        results: Vec<ToolResult>,
    },
}

/// Ordered, append-only sequence of turns. Exclusively owned and mutated by
/// the agent loop; turns are never edited or removed after insertion.
#[derive(Debug, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
