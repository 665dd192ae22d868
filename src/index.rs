//! Timestamp index for fast staleness checks
//!
//! This module provides [`TimestampIndex`], a persistent mapping of
//! root-relative paths to the last timestamp musdex observed for them. Besides
//! the files inside every extraction directory, the index records the
//! extraction directory itself (the archive mtime at the last extraction) and
//! the archive path (its mtime after the last combination).
//!
//! A path missing from the index has never been seen. Paths reported as
//! removed are dropped from the index entirely.
//!
//! The index is loaded once per command, mutated in memory, and written back
//! at most once, only if something changed.

use crate::error::{MusdexError, Result};
use crate::utils;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Persistent path → timestamp cache stored as YAML
#[derive(Debug, Clone)]
pub struct TimestampIndex {
    /// File the index is loaded from and saved to
    file: PathBuf,
    /// Indexed timestamps
    entries: BTreeMap<PathBuf, NaiveDateTime>,
    /// Whether the in-memory state differs from the file
    dirty: bool,
}

impl TimestampIndex {
    /// Load the index stored at `file`
    ///
    /// A missing or empty file yields an empty index.
    ///
    /// # Errors
    ///
    /// - [`MusdexError::FileAccess`] if the file exists but cannot be read
    /// - [`MusdexError::Yaml`] if the file is not a valid index
    pub fn load(file: &Path) -> Result<Self> {
        let entries = if file.exists() {
            debug!("Loading existing index: {}", file.display());
            let content =
                fs::read_to_string(file).map_err(|e| MusdexError::file_access(file, e))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_yaml::from_str(&content)?
            }
        } else {
            debug!("No index at {}, starting empty", file.display());
            BTreeMap::new()
        };

        Ok(TimestampIndex {
            file: file.to_path_buf(),
            entries,
            dirty: false,
        })
    }

    /// Create an empty index that will be saved to `file`
    pub fn empty(file: &Path) -> Self {
        TimestampIndex {
            file: file.to_path_buf(),
            entries: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Get the indexed timestamp of a path
    pub fn get(&self, path: &Path) -> Option<NaiveDateTime> {
        self.entries.get(path).copied()
    }

    /// Whether the path has ever been indexed
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Insert or replace the timestamp of a path
    pub fn upsert(&mut self, path: &Path, timestamp: NaiveDateTime) {
        trace!("Indexing {} at {}", path.display(), timestamp);
        self.entries.insert(path.to_path_buf(), timestamp);
        self.dirty = true;
    }

    /// Drop a path from the index
    ///
    /// Returns the timestamp it had, if any.
    pub fn remove(&mut self, path: &Path) -> Option<NaiveDateTime> {
        trace!("Dropping {} from index", path.display());
        let previous = self.entries.remove(path);
        // a removal request is a change even if the path was never indexed
        self.dirty = true;
        previous
    }

    /// Iterate over all entries in path order
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &NaiveDateTime)> + '_ {
        self.entries.iter()
    }

    /// Number of indexed paths
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether there are unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force the index to be written on the next [`save_if_dirty`](Self::save_if_dirty)
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// File backing this index
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Write the index to its file
    pub fn save(&mut self) -> Result<()> {
        debug!("Saving index: {}", self.file.display());
        let yaml = serde_yaml::to_string(&self.entries)?;
        utils::atomic_write(&self.file, yaml.as_bytes())?;
        self.dirty = false;
        Ok(())
    }

    /// Write the index only if it changed since loading
    ///
    /// Returns whether a write happened.
    pub fn save_if_dirty(&mut self) -> Result<bool> {
        if !self.dirty {
            trace!("Index unchanged, not saving");
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }
}
