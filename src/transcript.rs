//! Conversation transcript
//!
//! Append-only, in-memory log of every message exchanged in the session.
//! Insertion order is chronological order; nothing is ever edited or removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{PoisonError, RwLock};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
    Tool,
}

/// The invocation that produced a tool message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub call_id: String,
    pub name: String,
    pub input: Value,
    pub is_error: bool,
}

/// One conversational utterance. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolInvocation>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: String, tool: Option<ToolInvocation>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content,
            tool,
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into(), None)
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(Role::Agent, content.into(), None)
    }

    /// Observation produced by running a tool
    pub fn tool(invocation: ToolInvocation, output: impl Into<String>) -> Self {
        Self::new(Role::Tool, output.into(), Some(invocation))
    }

    /// Name of the originating tool, for tool messages
    pub fn tool_name(&self) -> Option<&str> {
        self.tool.as_ref().map(|t| t.name.as_str())
    }
}

/// Process-wide transcript shared by every turn of the session
#[derive(Debug, Default)]
pub struct TranscriptStore {
    messages: RwLock<Vec<Message>>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. The only mutator.
    pub fn append(&self, message: Message) {
        self.messages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    /// Full ordered history at time of call
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
