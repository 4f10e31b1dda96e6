//! On-disk cache of raw book text: one `book_<id>.txt` per identifier.
//!
//! Entries never expire. A forced refresh simply overwrites the file. There is no
//! locking, so two processes writing the same ID race and the last writer wins.

use crate::model::BookId;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cannot create cache directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read cached book {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write cached book {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Flat file cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct BookCache {
    dir: PathBuf,
}

impl BookCache {
    /// Open the cache, creating `dir` (and parents) if it does not exist.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, CacheError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::CreateDir {
            path: dir.clone(),
            source: e,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: BookId) -> PathBuf {
        self.dir.join(format!("book_{}.txt", id))
    }

    pub fn contains(&self, id: BookId) -> bool {
        self.path_for(id).is_file()
    }

    pub fn read(&self, id: BookId) -> Result<String, CacheError> {
        let path = self.path_for(id);
        std::fs::read_to_string(&path).map_err(|e| CacheError::Read { path, source: e })
    }

    pub fn write(&self, id: BookId, text: &str) -> Result<(), CacheError> {
        let path = self.path_for(id);
        std::fs::write(&path, text).map_err(|e| CacheError::Write {
            path: path.clone(),
            source: e,
        })?;
        tracing::debug!(book_id = %id, path = %path.display(), bytes = text.len(), "Cached book text");
        Ok(())
    }
}
