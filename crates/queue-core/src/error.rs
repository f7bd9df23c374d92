use std::error::Error as StdError;

use thiserror::Error;

use queue_vfs::traits::FSLockError;


/// Errors surfaced by a [`RecordLog`](crate::record_log::RecordLog) implementation.
///
/// The underlying filesystem's own error type is not threaded through generically; its
/// [`Display`](std::fmt::Display) output is captured instead, since a log is generic over any
/// [`ReadableFilesystem`]/[`WritableFilesystem`] pair and a per-filesystem error variant would
/// force every caller to name the concrete filesystem type.
///
/// [`ReadableFilesystem`]: queue_vfs::traits::ReadableFilesystem
/// [`WritableFilesystem`]: queue_vfs::traits::WritableFilesystem
#[derive(Debug, Error)]
pub enum LogError {
    /// Another instance already holds the lock on this storage.
    #[error("storage is already locked by another instance")]
    Locked,
    /// A read, write, seek, create, or delete operation against the backing filesystem failed.
    #[error("I/O error: {0}")]
    Io(String),
    /// The record frame layout was inconsistent beyond what corruption-skip recovery can handle.
    ///
    /// Reserved for invariants that should never fire in practice (e.g. a chunk directory entry
    /// whose name cannot be parsed as `data_<N>.bin` at all).
    #[error("record log format is corrupt beyond recovery: {0}")]
    BadFormat(String),
    /// An operation was attempted on a log that has already been [`close`]d.
    ///
    /// [`close`]: crate::record_log::RecordLog::close
    #[error("operation attempted on a closed log")]
    Closed,
}

impl LogError {
    pub(crate) fn io(err: impl StdError) -> Self {
        Self::Io(err.to_string())
    }

    pub(crate) fn from_lock_error(err: impl FSLockError) -> Self {
        if err.is_already_locked() {
            Self::Locked
        } else {
            Self::Io(err.to_string())
        }
    }
}

impl From<queue_vfs::error::MutexPoisoned> for LogError {
    fn from(err: queue_vfs::error::MutexPoisoned) -> Self {
        Self::io(err)
    }
}

/// An application payload could not be decoded from its stored bytes.
#[derive(Debug, Error)]
#[error("invalid payload encoding: {0}")]
pub struct BadPayload(pub String);

/// Errors surfaced by [`TransactionalQueue`](crate::queue::TransactionalQueue) operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The underlying log failed.
    #[error(transparent)]
    Log(#[from] LogError),
    /// Operation attempted on a queue that has already been [`close`]d.
    ///
    /// [`close`]: crate::queue::TransactionalQueue::close
    #[error("operation attempted on a closed queue")]
    Closed,
}
