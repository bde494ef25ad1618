use crate::types::PollCode;
use thiserror::Error;

/// Failure of the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("poll {0} already exists")]
    AlreadyExists(PollCode),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Typed failure of a poll operation.
///
/// The realtime gateway flattens every variant into a private `error` event
/// carrying the `Display` text, so the messages below are what clients see.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("Poll not found")]
    PollNotFound(PollCode),

    /// The client sent something that can never name a poll.
    #[error("Poll not found")]
    InvalidPollCode(String),

    #[error("Question not found")]
    QuestionNotFound {
        poll_code: PollCode,
        question_index: usize,
    },

    #[error("You have already answered this question")]
    DuplicateAnswer,

    #[error("{0}")]
    Validation(String),

    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),
}

impl PollError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PollNotFound(_) | Self::InvalidPollCode(_) | Self::QuestionNotFound { .. }
        )
    }
}

pub type PollResult<T> = Result<T, PollError>;
