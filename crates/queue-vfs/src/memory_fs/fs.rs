use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use hashbrown::{HashMap, HashSet};

use crate::error::MutexPoisoned;
use crate::fs_traits::{ReadableFilesystem, WritableFilesystem};

use super::error::MemoryFSError;
use super::file::{MemoryFile, MemoryRandomAccessFile, MemoryWriteFile};
use super::iter::DirectoryChildren;
use super::lockfile::{LockError, Lockfile};


#[derive(Debug, Default)]
struct Inner {
    files: HashMap<PathBuf, Arc<Mutex<Vec<u8>>>>,
    dirs:  HashSet<PathBuf>,
    locks: HashSet<PathBuf>,
}

/// An in-memory filesystem, useful for testing the record log and queue without touching disk.
///
/// Cloning a `MemoryFS` yields a handle to the same underlying storage; the storage itself is
/// only dropped once every clone has been dropped.
#[derive(Debug, Default, Clone)]
pub struct MemoryFS {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryFS {
    /// Creates a new, empty `MemoryFS`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_parent_dirs(inner: &mut Inner, path: &Path) {
        let mut ancestor = path;
        while let Some(parent) = ancestor.parent() {
            if !inner.dirs.insert(parent.to_path_buf()) {
                break;
            }
            ancestor = parent;
        }
    }
}

impl ReadableFilesystem for MemoryFS {
    type ReadFile               = MemoryFile;
    type RandomAccessFile       = MemoryFile;
    type Error                  = MemoryFSError;

    type DirectoryChildren      = DirectoryChildren;
    type DirectoryChildrenError = MemoryFSError;

    type Lockfile  = Lockfile;
    type LockError = LockError;

    fn open_sequential(&self, path: &Path) -> Result<Self::ReadFile, Self::Error> {
        let inner  = self.inner.lock().map_err(MutexPoisoned::from)?;
        let shared = inner.files.get(path).ok_or_else(|| MemoryFSError::NotFound(path.into()))?;

        Ok(MemoryFile::new(shared.clone()))
    }

    fn open_random_access(&self, path: &Path) -> Result<Self::RandomAccessFile, Self::Error> {
        self.open_sequential(path)
    }

    fn exists(&self, path: &Path) -> Result<bool, Self::Error> {
        let inner = self.inner.lock().map_err(MutexPoisoned::from)?;
        Ok(inner.files.contains_key(path) || inner.dirs.contains(path))
    }

    fn children(&self, path: &Path) -> Result<Self::DirectoryChildren, Self::Error> {
        let inner = self.inner.lock().map_err(MutexPoisoned::from)?;

        if !inner.dirs.contains(path) {
            return Err(MemoryFSError::NotFound(path.into()));
        }

        let mut children = Vec::new();

        for file_path in inner.files.keys() {
            if file_path.parent() == Some(path) {
                if let Some(name) = file_path.file_name() {
                    children.push(PathBuf::from(name));
                }
            }
        }

        for dir_path in &inner.dirs {
            if dir_path.parent() == Some(path) {
                if let Some(name) = dir_path.file_name() {
                    children.push(PathBuf::from(name));
                }
            }
        }

        Ok(DirectoryChildren::new(children))
    }

    fn size_of(&self, path: &Path) -> Result<u64, Self::Error> {
        let inner = self.inner.lock().map_err(MutexPoisoned::from)?;
        let buf   = inner.files.get(path).ok_or_else(|| MemoryFSError::NotFound(path.into()))?;
        let buf   = buf.lock().map_err(MutexPoisoned::from)?;

        Ok(buf.len() as u64)
    }

    fn open_and_lock(&self, path: &Path) -> Result<Self::Lockfile, Self::LockError> {
        let mut inner = self.inner.lock().map_err(MutexPoisoned::from)?;

        if !inner.files.contains_key(path) {
            return Err(LockError::NotFound(path.into()));
        }
        if !inner.locks.insert(path.to_path_buf()) {
            return Err(LockError::AlreadyLocked);
        }

        Ok(Lockfile(path.to_path_buf()))
    }

    fn unlock_and_close(&self, lockfile: Self::Lockfile) -> Result<(), Self::LockError> {
        let mut inner = self.inner.lock().map_err(MutexPoisoned::from)?;
        inner.locks.remove(&lockfile.0);
        Ok(())
    }
}

impl WritableFilesystem for MemoryFS {
    type WriteFile             = MemoryWriteFile;
    type AppendFile            = MemoryWriteFile;
    type RandomAccessWriteFile = MemoryRandomAccessFile;

    fn open_writable(
        &self,
        path:       &Path,
        create_dir: bool,
    ) -> Result<Self::WriteFile, Self::Error> {
        let mut inner = self.inner.lock().map_err(MutexPoisoned::from)?;

        if let Some(parent) = path.parent() {
            if !inner.dirs.contains(parent) {
                if create_dir {
                    Self::ensure_parent_dirs(&mut inner, path);
                } else {
                    return Err(MemoryFSError::NotFound(parent.into()));
                }
            }
        }

        let shared = inner
            .files
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .clone();

        Ok(MemoryWriteFile::new(shared, false))
    }

    fn open_appendable(
        &self,
        path:       &Path,
        create_dir: bool,
    ) -> Result<Self::AppendFile, Self::Error> {
        let mut inner = self.inner.lock().map_err(MutexPoisoned::from)?;

        if let Some(parent) = path.parent() {
            if !inner.dirs.contains(parent) {
                if create_dir {
                    Self::ensure_parent_dirs(&mut inner, path);
                } else {
                    return Err(MemoryFSError::NotFound(parent.into()));
                }
            }
        }

        let shared = inner
            .files
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .clone();

        Ok(MemoryWriteFile::new(shared, true))
    }

    fn open_random_access_writable(
        &self,
        path: &Path,
    ) -> Result<Self::RandomAccessWriteFile, Self::Error> {
        let inner  = self.inner.lock().map_err(MutexPoisoned::from)?;
        let shared = inner.files.get(path).ok_or_else(|| MemoryFSError::NotFound(path.into()))?;

        Ok(MemoryRandomAccessFile::new(shared.clone()))
    }

    fn set_len(&self, path: &Path, len: u64) -> Result<(), Self::Error> {
        let inner = self.inner.lock().map_err(MutexPoisoned::from)?;
        let shared = inner.files.get(path).ok_or_else(|| MemoryFSError::NotFound(path.into()))?;
        let mut buf = shared.lock().map_err(MutexPoisoned::from)?;

        let len = usize::try_from(len).map_err(|_err| MemoryFSError::NotFound(path.into()))?;
        buf.resize(len, 0);
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<(), Self::Error> {
        let mut inner = self.inner.lock().map_err(MutexPoisoned::from)?;

        inner
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| MemoryFSError::NotFound(path.into()))
    }

    fn create_dir(&self, path: &Path) -> Result<(), Self::Error> {
        let mut inner = self.inner.lock().map_err(MutexPoisoned::from)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !inner.dirs.contains(parent) {
                return Err(MemoryFSError::NotFound(parent.into()));
            }
        }
        if inner.dirs.contains(path) || inner.files.contains_key(path) {
            return Err(MemoryFSError::AlreadyExists(path.into()));
        }

        inner.dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), Self::Error> {
        let mut inner = self.inner.lock().map_err(MutexPoisoned::from)?;

        if inner.files.contains_key(path) {
            return Err(MemoryFSError::NotADirectory(path.into()));
        }

        Self::ensure_parent_dirs(&mut inner, path);
        inner.dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn remove_dir(&self, path: &Path) -> Result<(), Self::Error> {
        let mut inner = self.inner.lock().map_err(MutexPoisoned::from)?;

        if !inner.dirs.contains(path) {
            return Err(MemoryFSError::NotFound(path.into()));
        }

        let has_children = inner.files.keys().any(|p| p.parent() == Some(path))
            || inner.dirs.iter().any(|p| p.parent() == Some(path));

        if has_children {
            return Err(MemoryFSError::DirectoryNotEmpty(path.into()));
        }

        inner.dirs.remove(path);
        Ok(())
    }

    fn rename(&self, old: &Path, new: &Path) -> Result<(), Self::Error> {
        let mut inner = self.inner.lock().map_err(MutexPoisoned::from)?;

        if let Some(file) = inner.files.remove(old) {
            inner.files.insert(new.to_path_buf(), file);
            Ok(())
        } else if inner.dirs.remove(old) {
            inner.dirs.insert(new.to_path_buf());
            Ok(())
        } else {
            Err(MemoryFSError::NotFound(old.into()))
        }
    }

    fn create_and_lock(
        &self,
        path:       &Path,
        create_dir: bool,
    ) -> Result<Self::Lockfile, Self::LockError> {
        let mut inner = self.inner.lock().map_err(MutexPoisoned::from)?;

        if let Some(parent) = path.parent() {
            if !inner.dirs.contains(parent) {
                if create_dir {
                    Self::ensure_parent_dirs(&mut inner, path);
                } else {
                    return Err(LockError::NotFound(parent.into()));
                }
            }
        }

        inner
            .files
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())));

        if !inner.locks.insert(path.to_path_buf()) {
            return Err(LockError::AlreadyLocked);
        }

        Ok(Lockfile(path.to_path_buf()))
    }
}
