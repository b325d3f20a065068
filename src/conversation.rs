//! Conversation turn history
//!
//! An ordered list of chat turns headed by a fixed system turn. The history
//! is bounded; older turns are trimmed in pairs so the list never starts on
//! a dangling assistant reply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default cap on retained turns (including the system turn)
pub const DEFAULT_HISTORY_CAP: usize = 32;

/// Speaker role of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Fixed persona/instruction turn
    System,
    /// Spoken user utterance
    User,
    /// Model reply (possibly still streaming)
    Assistant,
}

/// One turn of the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Speaker role
    pub role: Role,
    /// Turn text; grows incrementally while an assistant turn streams
    pub content: String,
    /// When the turn was created
    #[serde(skip, default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    fn new(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            timestamp: Utc::now(),
        }
    }
}

/// Bounded conversation history with a single streaming cursor
pub struct Conversation {
    turns: Vec<ChatTurn>,
    /// Index of the assistant turn currently receiving deltas, if any
    open_assistant: Option<usize>,
    history_cap: usize,
}

impl Conversation {
    /// Create a conversation seeded with the system turn
    #[must_use]
    pub fn new(system_prompt: &str, history_cap: usize) -> Self {
        Self {
            turns: vec![ChatTurn::new(Role::System, system_prompt.to_string())],
            open_assistant: None,
            history_cap: history_cap.max(3),
        }
    }

    /// Append a user turn
    pub fn push_user(&mut self, content: String) {
        self.turns.push(ChatTurn::new(Role::User, content));
        self.trim();
    }

    /// Open a new assistant turn for streaming
    ///
    /// Returns the index deltas must be appended to. Any previously open
    /// turn is closed first; at most one assistant turn streams at a time.
    pub fn open_assistant(&mut self) -> usize {
        if self.open_assistant.is_some() {
            tracing::warn!("opening assistant turn while another is streaming");
        }
        self.turns.push(ChatTurn::new(Role::Assistant, String::new()));
        let index = self.turns.len() - 1;
        self.open_assistant = Some(index);
        index
    }

    /// Append streamed text to the designated open assistant turn
    ///
    /// Appends to any index other than the currently open turn are ignored,
    /// which makes late deltas from an aborted call harmless.
    pub fn append_delta(&mut self, index: usize, delta: &str) {
        if self.open_assistant != Some(index) {
            tracing::warn!(index, "dropping delta for closed assistant turn");
            return;
        }
        if let Some(turn) = self.turns.get_mut(index) {
            turn.content.push_str(delta);
        }
    }

    /// Close the streaming assistant turn
    pub fn close_assistant(&mut self) {
        self.open_assistant = None;
        self.trim();
    }

    /// Whether an assistant turn is currently streaming
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        self.open_assistant.is_some()
    }

    /// All turns in order, system turn first
    #[must_use]
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Content of the last turn, if any beyond the system turn
    #[must_use]
    pub fn last_content(&self) -> Option<&str> {
        self.turns
            .last()
            .filter(|t| t.role != Role::System)
            .map(|t| t.content.as_str())
    }

    /// Drop the oldest non-system turns past the cap, two at a time
    fn trim(&mut self) {
        // Never trim through the open streaming turn
        if self.open_assistant.is_some() {
            return;
        }
        while self.turns.len() > self.history_cap && self.turns.len() > 3 {
            self.turns.drain(1..3);
        }
    }
}
