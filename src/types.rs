//! Core data types shared by the handlers and the driver
//!
//! ## Overview
//!
//! - **Change stream**: [`ChangeRecord`] and [`EntryState`], produced lazily by
//!   archive handlers and applied by the driver
//! - **Per-archive view**: [`SubManifest`], the VCS listing restricted to one
//!   extraction directory and joined with indexed timestamps
//! - **Results**: [`SyncReport`], [`AddReport`], [`RemoveReport`]
//! - **Options**: [`AddOptions`]
//!
//! ## Examples
//!
//! ```rust
//! use musdex::types::{ChangeRecord, EntryState};
//! use chrono::NaiveDate;
//!
//! let stamp = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
//! let record = ChangeRecord::modified("_musdex/a.zip/x.txt", stamp);
//! assert_eq!(record.state, EntryState::Modified(stamp));
//! assert!(!record.is_removal());
//! ```

use crate::error::Result;
use crate::utils;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// New state of a path reported by a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// The path was written (or observed) with this timestamp
    Modified(NaiveDateTime),
    /// The path existed in the sub-manifest but is gone from the source side
    Removed,
}

/// One change emitted by an archive handler
///
/// Paths are relative to the working tree root, like every key of the
/// timestamp index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// Root-relative path that changed
    pub path: PathBuf,
    /// What happened to it
    pub state: EntryState,
}

impl ChangeRecord {
    /// Record a path written with the given timestamp
    pub fn modified(path: impl Into<PathBuf>, timestamp: NaiveDateTime) -> Self {
        Self {
            path: path.into(),
            state: EntryState::Modified(timestamp),
        }
    }

    /// Record a path that disappeared from the source side
    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: EntryState::Removed,
        }
    }

    /// Timestamp carried by the record, `None` for removals
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        match self.state {
            EntryState::Modified(timestamp) => Some(timestamp),
            EntryState::Removed => None,
        }
    }

    /// Whether this record is a deletion marker
    pub fn is_removal(&self) -> bool {
        self.state == EntryState::Removed
    }
}

/// The VCS manifest restricted to one extraction directory
///
/// Maps each tracked path under the directory to its indexed timestamp, or
/// `None` when the index has never seen it. Built fresh for every pass and
/// never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubManifest {
    entries: BTreeMap<PathBuf, Option<NaiveDateTime>>,
}

impl SubManifest {
    /// Create an empty sub-manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the sub-manifest of `location` from a full VCS listing
    ///
    /// Membership is decided per path component, so `_musdex/a.zip2/x` does
    /// not belong to `_musdex/a.zip`. The extraction directory itself is
    /// never a member.
    pub fn build<'a, I, F>(tracked: I, location: &Path, lookup: F) -> Self
    where
        I: IntoIterator<Item = &'a PathBuf>,
        F: Fn(&Path) -> Option<NaiveDateTime>,
    {
        let entries = tracked
            .into_iter()
            .filter(|path| path.starts_with(location) && path.as_path() != location)
            .map(|path| (path.clone(), lookup(path)))
            .collect();
        Self { entries }
    }

    /// Add or replace one member
    pub fn insert(&mut self, path: impl Into<PathBuf>, timestamp: Option<NaiveDateTime>) {
        self.entries.insert(path.into(), timestamp);
    }

    /// Whether the path is a member
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Indexed timestamp of a member
    ///
    /// The outer `Option` is membership, the inner one is whether the index
    /// knows the path.
    pub fn get(&self, path: &Path) -> Option<Option<NaiveDateTime>> {
        self.entries.get(path).copied()
    }

    /// Member paths in sorted order
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> + '_ {
        self.entries.keys()
    }

    /// Members with their indexed timestamps
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, Option<NaiveDateTime>)> + '_ {
        self.entries.iter().map(|(path, stamp)| (path, *stamp))
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no members
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any member changed on disk since it was indexed
    ///
    /// A member the index has never seen counts as changed. Otherwise a
    /// member is changed only when its on-disk mtime is strictly newer than
    /// the indexed timestamp.
    pub fn has_changes_on_disk(&self, root: &Path) -> Result<bool> {
        for (path, indexed) in &self.entries {
            let Some(indexed) = indexed else {
                return Ok(true);
            };
            if utils::mtime(&root.join(path))? > *indexed {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl FromIterator<(PathBuf, Option<NaiveDateTime>)> for SubManifest {
    fn from_iter<T: IntoIterator<Item = (PathBuf, Option<NaiveDateTime>)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Outcome of an extract or combine run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Archives whose handler was invoked
    pub archives_processed: Vec<PathBuf>,
    /// Archives skipped by the staleness gate
    pub archives_skipped: Vec<PathBuf>,
    /// Files written (extracted files, or files packed into an archive)
    pub files_written: usize,
    /// Files dropped because they vanished from the archive
    pub files_removed: usize,
    /// Paths newly added to version control
    pub vcs_added: usize,
    /// Whether the index was written back
    pub index_saved: bool,
}

impl SyncReport {
    /// Whether the run changed anything
    pub fn has_changes(&self) -> bool {
        self.files_written > 0 || self.files_removed > 0 || self.index_saved
    }

    /// Total number of per-file operations
    pub fn total_operations(&self) -> usize {
        self.files_written + self.files_removed
    }
}

/// Options for [`crate::Musdex::add`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOptions {
    /// Start a new archive from its (possibly empty) extraction directory
    pub new: bool,
    /// Handler name to record with the archive (default: zip)
    pub handler: Option<String>,
}

/// Outcome of an `add` run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddReport {
    /// Archives now tracked
    pub added: Vec<PathBuf>,
    /// Archives skipped, with the reason
    pub skipped: Vec<(PathBuf, String)>,
    /// Files extracted or packed while adding
    pub files: usize,
}

/// Outcome of a `remove` run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveReport {
    /// Archives no longer tracked
    pub removed: Vec<PathBuf>,
    /// Archives that were not configured
    pub skipped: Vec<PathBuf>,
    /// Paths removed from version control
    pub files_removed: usize,
}
