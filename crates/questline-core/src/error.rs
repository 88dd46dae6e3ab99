// Error taxonomy for the questline core.
//
// None of these are fatal to the process: each is scoped to one interaction
// or one scheduler-tick item and maps to a user-facing reply at the handler
// edge.

use thiserror::Error;

/// Result type alias for questline operations
pub type Result<T> = std::result::Result<T, QuestlineError>;

/// Errors that can occur while driving the event game
#[derive(Debug, Error)]
pub enum QuestlineError {
    /// Callback token failed to decode or carried an out-of-range index
    #[error("malformed callback token: {0}")]
    MalformedToken(String),

    /// The referenced event game was deleted or never existed
    #[error("unknown event game: {0}")]
    UnknownEventGame(String),

    /// Catalog fetch or parse failed; the caller may retry
    #[error("event source unavailable: {0}")]
    SourceUnavailable(String),

    /// Content generator produced malformed output after all attempts
    #[error("content generation failed after {0} attempts")]
    GenerationFailed(u32),

    /// Organizer-submitted content failed shape validation
    #[error("validation failed: {0}")]
    Validation(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl QuestlineError {
    /// Create a malformed token error
    pub fn malformed(token: impl Into<String>) -> Self {
        QuestlineError::MalformedToken(token.into())
    }

    /// Create an unknown event game error
    pub fn unknown_event(event_id: impl Into<String>) -> Self {
        QuestlineError::UnknownEventGame(event_id.into())
    }

    /// Create a source unavailable error
    pub fn source(msg: impl Into<String>) -> Self {
        QuestlineError::SourceUnavailable(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        QuestlineError::Validation(msg.into())
    }
}
