//! Error types for timer operations

use thiserror::Error;

/// Errors reported by [`TimerTask`](super::TimerTask).
///
/// Cancellation is not an error: a run ended by either signal returns
/// `Ok` with [`RunExit::Cancelled`](super::RunExit::Cancelled).
#[derive(Debug, Error)]
pub enum TimerError {
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("timer task has been disposed")]
    Disposed,

    #[error("action failed on fire {fire}: {reason}")]
    ActionFault { fire: u64, reason: String },
}

impl TimerError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}
