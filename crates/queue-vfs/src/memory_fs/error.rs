use std::path::PathBuf;

use thiserror::Error;

use crate::error::MutexPoisoned;
use crate::util_traits::FSError;


/// The error type returned by [`MemoryFS`](super::MemoryFS)'s
/// [`ReadableFilesystem`](crate::fs_traits::ReadableFilesystem) and
/// [`WritableFilesystem`](crate::fs_traits::WritableFilesystem) implementations.
#[derive(Debug, Error)]
pub enum MemoryFSError {
    #[error("no entry exists at {0:?}")]
    NotFound(PathBuf),
    #[error("an entry already exists at {0:?}")]
    AlreadyExists(PathBuf),
    #[error("{0:?} is a directory, not a file")]
    IsADirectory(PathBuf),
    #[error("{0:?} is a file, not a directory")]
    NotADirectory(PathBuf),
    #[error("directory {0:?} is not empty")]
    DirectoryNotEmpty(PathBuf),
    #[error("a mutex guarding the in-memory filesystem was poisoned")]
    Poisoned,
}

impl From<MutexPoisoned> for MemoryFSError {
    #[inline]
    fn from(_err: MutexPoisoned) -> Self {
        Self::Poisoned
    }
}

impl FSError for MemoryFSError {
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
