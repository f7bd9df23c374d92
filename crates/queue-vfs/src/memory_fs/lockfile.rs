use std::path::PathBuf;

use thiserror::Error;

use crate::error::MutexPoisoned;
use crate::util_traits::FSLockError;


/// A handle representing an acquired, exclusive lock on a path within a [`MemoryFS`](super::MemoryFS).
///
/// Dropping this without calling [`unlock_and_close`] leaves the path locked forever within that
/// `MemoryFS`, mirroring how a leaked [`File`] lock on Unix is only released when the process
/// exits.
///
/// [`unlock_and_close`]: crate::fs_traits::ReadableFilesystem::unlock_and_close
/// [`File`]: std::fs::File
#[derive(Debug)]
pub struct Lockfile(pub(super) PathBuf);

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lockfile was already acquired by something else")]
    AlreadyLocked,
    #[error("no entry exists at {0:?}")]
    NotFound(PathBuf),
    #[error("a mutex guarding the in-memory filesystem was poisoned")]
    Poisoned,
}

impl From<MutexPoisoned> for LockError {
    #[inline]
    fn from(_err: MutexPoisoned) -> Self {
        Self::Poisoned
    }
}

impl FSLockError for LockError {
    #[inline]
    fn is_already_locked(&self) -> bool {
        matches!(self, Self::AlreadyLocked)
    }

    #[inline]
    fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    #[inline]
    fn is_interrupted(&self) -> bool {
        false
    }

    #[inline]
    fn is_poison_error(&self) -> bool {
        matches!(self, Self::Poisoned)
    }
}
