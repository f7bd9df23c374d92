use std::path::PathBuf;
use std::vec::IntoIter;

use super::error::MemoryFSError;


/// Iterator over the immediate children of a directory in a [`MemoryFS`](super::MemoryFS).
///
/// Collected eagerly when the directory is read, rather than walked lazily, since the backing
/// store is just a lock-guarded map.
#[derive(Debug)]
pub struct DirectoryChildren {
    children: IntoIter<PathBuf>,
}

impl DirectoryChildren {
    pub(super) fn new(children: Vec<PathBuf>) -> Self {
        Self { children: children.into_iter() }
    }
}

impl Iterator for DirectoryChildren {
    type Item = Result<PathBuf, MemoryFSError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.children.next().map(Ok)
    }
}
