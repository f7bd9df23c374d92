//! An in-memory [`ReadableFilesystem`]/[`WritableFilesystem`] implementation, useful for testing
//! record log and queue logic without touching disk.
//!
//! Unlike [`std_fs`](crate::std_fs), paths are not normalized or canonicalized in any way; the
//! queue crate never constructs paths with `..` components or symlink-dependent behavior, so a
//! `MemoryFS` just keys its files by the exact [`PathBuf`] it is given.
//!
//! [`ReadableFilesystem`]: crate::fs_traits::ReadableFilesystem
//! [`WritableFilesystem`]: crate::fs_traits::WritableFilesystem
//! [`PathBuf`]: std::path::PathBuf

mod error;
mod file;
mod fs;
mod iter;
mod lockfile;

pub use self::error::MemoryFSError;
pub use self::file::{MemoryFile, MemoryRandomAccessFile, MemoryWriteFile};
pub use self::fs::MemoryFS;
pub use self::iter::DirectoryChildren;
pub use self::lockfile::{LockError, Lockfile};
