//! Utility functions for musdex
//!
//! This module gathers the small helpers that the index, the handlers and the
//! driver share:
//!
//! ### Timestamps
//! - Reading a file's modification time as a local, second-resolution
//!   [`NaiveDateTime`] (the unit stored in the index)
//! - Setting a file's modification time from such a timestamp
//! - Converting between zip DOS date/time stamps and [`NaiveDateTime`]
//!
//! ### Paths
//! - Lexical normalisation of relative paths (`./a/../b` → `b`)
//! - Making user-supplied paths relative to the working tree root
//! - Building `/`-separated names for archive members and pattern matching
//!
//! ### File Operations
//! - Atomic file writing

use crate::error::{MusdexError, Result};
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use filetime::FileTime;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tracing::trace;

/// Convert a [`SystemTime`] into the local, whole-second timestamp used by the index
pub fn local_timestamp(time: SystemTime) -> NaiveDateTime {
    let local: DateTime<Local> = time.into();
    let naive = local.naive_local();
    naive.with_nanosecond(0).unwrap_or(naive)
}

/// Read a file's modification time
///
/// The result is in local time and truncated to whole seconds, so two
/// timestamps taken from the same unmodified file always compare equal.
///
/// # Errors
///
/// - [`MusdexError::FileAccess`] if the file does not exist or its metadata
///   cannot be read
pub fn mtime(path: &Path) -> Result<NaiveDateTime> {
    let metadata = fs::metadata(path).map_err(|e| MusdexError::file_access(path, e))?;
    let modified = metadata
        .modified()
        .map_err(|e| MusdexError::file_access(path, e))?;
    Ok(local_timestamp(modified))
}

/// Set a file's modification time from a local timestamp
///
/// Timestamps that fall into a daylight-saving gap have no local
/// representation; those files are left untouched.
pub fn set_mtime(path: &Path, timestamp: NaiveDateTime) -> Result<()> {
    let Some(local) = Local.from_local_datetime(&timestamp).earliest() else {
        trace!("No local time for {} on {:?}, leaving mtime", timestamp, path);
        return Ok(());
    };
    let system: SystemTime = local.into();
    filetime::set_file_mtime(path, FileTime::from_system_time(system))
        .map_err(|e| MusdexError::file_access(path, e))
}

/// Convert a zip entry's DOS date/time into a timestamp
///
/// Returns `None` for stamps that do not describe a real calendar date.
pub fn from_zip_datetime(stamp: zip::DateTime) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(
        i32::from(stamp.year()),
        u32::from(stamp.month()),
        u32::from(stamp.day()),
    )?
    .and_hms_opt(
        u32::from(stamp.hour()),
        u32::from(stamp.minute()),
        u32::from(stamp.second()),
    )
}

/// Convert a timestamp into a zip DOS date/time
///
/// DOS stamps cover 1980..=2107 with two-second resolution; anything
/// outside that range is clamped to the zip default of 1980-01-01.
pub fn to_zip_datetime(timestamp: NaiveDateTime) -> zip::DateTime {
    u16::try_from(timestamp.year())
        .ok()
        .and_then(|year| {
            zip::DateTime::from_date_and_time(
                year,
                timestamp.month() as u8,
                timestamp.day() as u8,
                timestamp.hour() as u8,
                timestamp.minute() as u8,
                timestamp.second() as u8,
            )
            .ok()
        })
        .unwrap_or_default()
}

/// Lexically normalise a relative path
///
/// Drops `.` components and folds `..` into its parent where possible.
/// Nothing is resolved against the file system.
pub fn normalize_relative(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Make a path relative to a base path
///
/// A lexical strip is tried first; if that fails both paths are
/// canonicalised and compared again.
///
/// # Errors
///
/// - [`MusdexError::PathOutsideRoot`] if the path is not under the base path
/// - [`MusdexError::FileAccess`] if canonicalisation fails
pub fn make_relative(path: &Path, base: &Path) -> Result<PathBuf> {
    if let Ok(relative) = path.strip_prefix(base) {
        return Ok(relative.to_path_buf());
    }

    let path_canon = path
        .canonicalize()
        .map_err(|e| MusdexError::file_access(path, e))?;
    let base_canon = base
        .canonicalize()
        .map_err(|e| MusdexError::file_access(base, e))?;

    path_canon
        .strip_prefix(&base_canon)
        .map(|p| p.to_path_buf())
        .map_err(|_| MusdexError::PathOutsideRoot {
            path: path.to_path_buf(),
            root: base.to_path_buf(),
        })
}

/// Turn a user-supplied archive path into its canonical root-relative form
///
/// Absolute paths must lie under `root`; relative paths are taken as
/// relative to `root` already.
pub fn relative_to_root(root: &Path, path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize_relative(&make_relative(path, root)?))
    } else {
        Ok(normalize_relative(path))
    }
}

/// Render a relative path with `/` separators on every platform
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Name of a file inside an archive, given its extraction directory
pub fn member_name(location: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(location).map_err(|_| {
        MusdexError::internal(format!("{:?} is not inside {:?}", path, location))
    })?;
    Ok(slash_path(relative))
}

/// Atomic file write (write to temp file then rename)
///
/// Creates the parent directory when needed. The target is never observed
/// half-written.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| MusdexError::file_access(parent, e))?;
        }
    }

    let mut file_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    file_name.push(".tmp");
    let temp_path = path.with_file_name(file_name);

    fs::write(&temp_path, content).map_err(|e| MusdexError::file_access(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| MusdexError::file_access(path, e))?;

    Ok(())
}
