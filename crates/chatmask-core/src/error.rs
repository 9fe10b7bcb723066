//! Error types for chatmask.

use thiserror::Error;

/// Result type alias for chatmask operations.
pub type Result<T> = std::result::Result<T, ChatMaskError>;

/// Main error type for chatmask operations.
///
/// Validation failures on a conversation record are fatal for that record and
/// are returned to the caller, which decides whether to skip the record or
/// abort the batch. Alignment problems during masking are not represented
/// here; they degrade to an all-ignored label mask instead.
#[derive(Error, Debug)]
pub enum ChatMaskError {
    /// The conversation has fewer than two usable turns.
    #[error("Conversation has {turns} usable turn(s), at least 2 are required")]
    TooShortConversation {
        /// Number of turns left after system extraction and leading-turn cleanup.
        turns: usize,
    },

    /// Turn roles do not alternate between user and assistant.
    #[error(
        "Role did not alternate between turns at index {index}: expected {expected}, found {found}. Please check your data."
    )]
    RoleAlternation {
        /// Index of the offending turn within the normalized turn list.
        index: usize,
        /// Role expected at this position.
        expected: String,
        /// Role actually found.
        found: String,
    },

    /// A turn carries a role name outside the known set.
    #[error("Unknown role {role:?} at turn {index}")]
    UnknownRole {
        /// Index of the offending turn in the raw record.
        index: usize,
        /// The unrecognized role string.
        role: String,
    },

    /// Tokenizer errors.
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatMaskError {
    /// Whether this error means the record itself is unusable.
    ///
    /// Record errors are safe to skip; everything else points at the
    /// environment (tokenizer, configuration, I/O) and usually warrants an abort.
    pub fn is_record_error(&self) -> bool {
        matches!(
            self,
            Self::TooShortConversation { .. } | Self::RoleAlternation { .. } | Self::UnknownRole { .. }
        )
    }
}
