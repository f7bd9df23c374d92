//! Filesystem abstractions for the transactional queue: a [`ReadableFilesystem`] /
//! [`WritableFilesystem`] pair of traits, a real-disk implementation backed by [`std::fs`]
//! (guarded by exclusive OS-level lockfiles), and an in-memory implementation used in tests to
//! exercise corruption and reclamation paths without touching disk.

// Main filesystem traits
mod fs_traits;
// Traits relied on by filesystem traits
mod util_traits;


// Implementations

#[cfg(feature = "std-fs")]
pub mod std_fs;

pub mod memory_fs;


/// Module containing all the traits defined in this crate. May be used as a prelude.
pub mod traits {
    pub use crate::{
        fs_traits::{DebugReadableFS, DebugWritableFS, ReadableFilesystem, WritableFilesystem},
        util_traits::{
            FSError, FSLockError, RandomAccess, RandomAccessWrite, SyncRandomAccess, WritableFile,
        },
    };
}

pub mod error;

#[cfg(feature = "std-fs")]
pub use self::std_fs::StandardFS;

pub use self::memory_fs::MemoryFS;
