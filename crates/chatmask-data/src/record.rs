//! Conversation record schema.
//!
//! Records arrive one per JSON line, either as a bare turn array
//! (`[{"from": "human", "value": "..."}, ...]`) or as a ShareGPT object
//! (`{"conversations": [...]}`).

use chatmask_core::{ChatMaskError, Result};
use serde::{Deserialize, Serialize};

/// Speaker of a single turn, as named in the raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Speaker {
    /// System preamble override ("system").
    System,
    /// The user ("human", also accepted as "user").
    Human,
    /// The assistant ("gpt", also accepted as "assistant").
    Gpt,
}

impl Speaker {
    /// Parse a raw `from` value. Returns `None` for unrecognized names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "system" => Some(Self::System),
            "human" | "user" => Some(Self::Human),
            "gpt" | "assistant" => Some(Self::Gpt),
            _ => None,
        }
    }

    /// Canonical record name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Human => "human",
            Self::Gpt => "gpt",
        }
    }
}

/// One role-tagged message of a raw record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Raw role name.
    pub from: String,
    /// Message text.
    pub value: String,
}

impl Turn {
    /// Create a new turn.
    pub fn new(from: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            value: value.into(),
        }
    }

    /// Create a system turn.
    pub fn system(value: impl Into<String>) -> Self {
        Self::new("system", value)
    }

    /// Create a human turn.
    pub fn human(value: impl Into<String>) -> Self {
        Self::new("human", value)
    }

    /// Create a gpt turn.
    pub fn gpt(value: impl Into<String>) -> Self {
        Self::new("gpt", value)
    }

    /// The parsed speaker, if the role name is known.
    pub fn speaker(&self) -> Option<Speaker> {
        Speaker::from_name(&self.from)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordRepr {
    Bare(Vec<Turn>),
    ShareGpt { conversations: Vec<Turn> },
}

impl From<RecordRepr> for ConversationRecord {
    fn from(repr: RecordRepr) -> Self {
        match repr {
            RecordRepr::Bare(conversations) | RecordRepr::ShareGpt { conversations } => {
                Self { conversations }
            }
        }
    }
}

/// A raw multi-turn training record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RecordRepr")]
pub struct ConversationRecord {
    /// Turns in their original order.
    pub conversations: Vec<Turn>,
}

impl ConversationRecord {
    /// Create a record from turns.
    pub fn new(conversations: Vec<Turn>) -> Self {
        Self { conversations }
    }

    /// Parse a record from a single JSON line.
    pub fn from_json(line: &str) -> Result<Self> {
        serde_json::from_str(line)
            .map_err(|e| ChatMaskError::Serialization(format!("Invalid conversation record: {}", e)))
    }

    /// All turns.
    pub fn turns(&self) -> &[Turn] {
        &self.conversations
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Check if the record has no turns.
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}

impl From<Vec<Turn>> for ConversationRecord {
    fn from(conversations: Vec<Turn>) -> Self {
        Self { conversations }
    }
}
