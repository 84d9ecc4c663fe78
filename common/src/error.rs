//! # Error Taxonomy
//!
//! Every fallible operation of the core resolves to one [`GmpError`] variant.
//! The variants map one-to-one onto the recovery options available to a caller:
//!
//! * [`GmpError::Transient`]: re-issue the same call after the channel reconnects.
//! * [`GmpError::Protocol`]: not retryable; the remote contract was violated or we sent garbage.
//! * [`GmpError::Remote`]: the manager understood the command and refused it.
//! * [`GmpError::NotFound`]: the requested entity does not exist (yet).
//! * [`GmpError::InvalidState`]: the task lifecycle forbids the operation right now.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GmpError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GmpError {
    #[error("session unavailable: {0}")]
    Transient(String),

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("'{command}' rejected by manager ({status}): {text}")]
    Remote {
        command: String,
        status: u16,
        text: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("cannot {operation} task {task_id} while it is {state}")]
    InvalidState {
        task_id: String,
        state: String,
        operation: &'static str,
    },
}

impl GmpError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// True when the manager refused a create because the name is taken.
    ///
    /// gvmd answers `400 Target exists already` (older releases used
    /// `already exists`), so both phrasings are accepted.
    pub fn is_duplicate_name(&self) -> bool {
        match self {
            Self::Remote { status, text, .. } => {
                let text = text.to_ascii_lowercase();
                *status == 400 && (text.contains("exists already") || text.contains("already exists"))
            }
            _ => false,
        }
    }
}
