//! Built-in zip archive handler
//!
//! Extraction walks the archive's central directory in order and writes
//! entries lazily, one per call to `next()`. Combination always rebuilds the
//! whole archive: zip has no cheap in-place update, so every member of the
//! sub-manifest is packed into a fresh file that replaces the archive once
//! it is complete.

use crate::archive::{ArchiveHandler, Changes, HandlerContext};
use crate::error::{MusdexError, Result};
use crate::types::ChangeRecord;
use crate::utils;
use chrono::NaiveDateTime;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tracing::{debug, info, trace, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Handler for zip-based formats (`.zip`, OOXML, ODF, ...)
#[derive(Debug, Clone)]
pub struct ZipHandler {
    ctx: HandlerContext,
}

impl ZipHandler {
    /// Bind a handler to an archive, its extraction directory and sub-manifest
    pub fn new(ctx: HandlerContext) -> Self {
        ZipHandler { ctx }
    }

    /// Context this handler is bound to
    pub fn context(&self) -> &HandlerContext {
        &self.ctx
    }
}

impl ArchiveHandler for ZipHandler {
    fn check(&self) -> Result<bool> {
        let path = self.ctx.archive_path();
        if !path.is_file() {
            return Ok(false);
        }
        let file = File::open(&path).map_err(|e| MusdexError::file_access(&path, e))?;
        Ok(ZipArchive::new(file).is_ok())
    }

    fn extract(&self, force: bool) -> Result<Changes<'_>> {
        Ok(Box::new(ZipExtract::open(&self.ctx, force)?))
    }

    fn combine(&self, _force: bool) -> Result<Changes<'_>> {
        Ok(Box::new(ZipCombine::create(&self.ctx)?))
    }
}

/// Lazy extraction of a zip archive
struct ZipExtract<'a> {
    ctx: &'a HandlerContext,
    archive: ZipArchive<File>,
    archive_mtime: NaiveDateTime,
    next_index: usize,
    force: bool,
    /// Sub-manifest members no archive entry has matched yet
    unmatched: BTreeSet<PathBuf>,
    location_reported: bool,
    done: bool,
}

impl<'a> ZipExtract<'a> {
    fn open(ctx: &'a HandlerContext, force: bool) -> Result<Self> {
        let archive_path = ctx.archive_path();
        let file = File::open(&archive_path).map_err(|e| MusdexError::file_access(&archive_path, e))?;
        let archive = ZipArchive::new(file)?;
        let archive_mtime = utils::mtime(&archive_path)?;

        let location = ctx.location_path();
        fs::create_dir_all(&location).map_err(|e| MusdexError::file_access(&location, e))?;

        debug!(
            "Extracting {} ({} entries, force: {})",
            ctx.archive.display(),
            archive.len(),
            force
        );

        Ok(ZipExtract {
            ctx,
            archive,
            archive_mtime,
            next_index: 0,
            force,
            unmatched: ctx.manifest.paths().cloned().collect(),
            location_reported: false,
            done: false,
        })
    }

    fn step(&mut self) -> Result<Option<ChangeRecord>> {
        while self.next_index < self.archive.len() {
            let index = self.next_index;
            self.next_index += 1;
            if let Some(record) = self.extract_entry(index)? {
                return Ok(Some(record));
            }
        }

        if let Some(path) = self.unmatched.pop_first() {
            debug!("{} is no longer in the archive", path.display());
            return Ok(Some(ChangeRecord::removed(path)));
        }

        if !self.location_reported {
            self.location_reported = true;
            return Ok(Some(ChangeRecord::modified(
                self.ctx.location.clone(),
                self.archive_mtime,
            )));
        }

        Ok(None)
    }

    /// Directory entries are created on disk but yield no record.
    fn extract_entry(&mut self, index: usize) -> Result<Option<ChangeRecord>> {
        let mut entry = self.archive.by_index(index)?;
        let Some(name) = entry.enclosed_name() else {
            warn!("Skipping unsafe entry name in {}: {}", self.ctx.archive.display(), entry.name());
            return Ok(None);
        };

        let disk_path = self.ctx.location_path().join(&name);
        if entry.is_dir() {
            fs::create_dir_all(&disk_path).map_err(|e| MusdexError::file_access(&disk_path, e))?;
            return Ok(None);
        }

        let path = self.ctx.location.join(&name);
        self.unmatched.remove(&path);

        let timestamp = entry
            .last_modified()
            .and_then(utils::from_zip_datetime)
            .unwrap_or(self.archive_mtime);

        let write = self.force
            || match self.ctx.manifest.get(&path) {
                None | Some(None) => true,
                Some(Some(indexed)) => timestamp > indexed,
            };
        if !write {
            trace!("Up to date: {}", path.display());
            return Ok(None);
        }

        if let Some(parent) = disk_path.parent() {
            fs::create_dir_all(parent).map_err(|e| MusdexError::file_access(parent, e))?;
        }
        let mut out = File::create(&disk_path).map_err(|e| MusdexError::file_access(&disk_path, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| MusdexError::file_access(&disk_path, e))?;
        drop(out);
        utils::set_mtime(&disk_path, timestamp)?;

        debug!("Extracted {}", path.display());
        Ok(Some(ChangeRecord::modified(path, timestamp)))
    }
}

impl Iterator for ZipExtract<'_> {
    type Item = Result<ChangeRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Lazy full rebuild of a zip archive
///
/// Entries go into a temporary file next to the archive. The archive is only
/// replaced after the last entry is written, so a failure leaves it intact.
struct ZipCombine<'a> {
    ctx: &'a HandlerContext,
    members: std::vec::IntoIter<PathBuf>,
    writer: Option<ZipWriter<NamedTempFile>>,
}

impl<'a> ZipCombine<'a> {
    fn create(ctx: &'a HandlerContext) -> Result<Self> {
        let archive_path = ctx.archive_path();
        let parent = archive_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| ctx.root.clone());
        fs::create_dir_all(&parent).map_err(|e| MusdexError::file_access(&parent, e))?;
        let temp = NamedTempFile::new_in(&parent).map_err(|e| MusdexError::file_access(&parent, e))?;

        debug!(
            "Rebuilding {} from {} files",
            ctx.archive.display(),
            ctx.manifest.len()
        );

        Ok(ZipCombine {
            ctx,
            members: ctx.manifest.paths().cloned().collect::<Vec<_>>().into_iter(),
            writer: Some(ZipWriter::new(temp)),
        })
    }

    fn step(&mut self) -> Result<Option<ChangeRecord>> {
        for path in self.members.by_ref() {
            let disk_path = self.ctx.root.join(&path);
            if disk_path.is_dir() {
                trace!("Not packing directory {}", path.display());
                continue;
            }

            let writer = self
                .writer
                .as_mut()
                .ok_or_else(|| MusdexError::internal("zip writer already finished"))?;
            let timestamp = utils::mtime(&disk_path)?;
            let name = utils::member_name(&self.ctx.location, &path)?;
            let options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .last_modified_time(utils::to_zip_datetime(timestamp));

            writer.start_file(name, options)?;
            let mut source = File::open(&disk_path).map_err(|e| MusdexError::file_access(&disk_path, e))?;
            io::copy(&mut source, writer).map_err(|e| MusdexError::file_access(&disk_path, e))?;

            trace!("Packed {}", path.display());
            return Ok(Some(ChangeRecord::modified(path, timestamp)));
        }

        match self.writer.take() {
            Some(writer) => self.finish(writer).map(Some),
            None => Ok(None),
        }
    }

    fn finish(&self, writer: ZipWriter<NamedTempFile>) -> Result<ChangeRecord> {
        let temp = writer.finish()?;
        let archive_path = self.ctx.archive_path();

        match fs::metadata(&archive_path) {
            Ok(metadata) => fs::set_permissions(temp.path(), metadata.permissions())
                .map_err(|e| MusdexError::file_access(temp.path(), e))?,
            Err(_) => set_new_archive_permissions(temp.path())?,
        }

        temp.persist(&archive_path)
            .map_err(|e| MusdexError::file_access(&archive_path, e.error))?;

        let timestamp = utils::mtime(&archive_path)?;
        info!("Combined {}", self.ctx.archive.display());
        Ok(ChangeRecord::modified(self.ctx.archive.clone(), timestamp))
    }
}

#[cfg(unix)]
fn set_new_archive_permissions(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
        .map_err(|e| MusdexError::file_access(path, e))
}

#[cfg(not(unix))]
fn set_new_archive_permissions(_path: &std::path::Path) -> Result<()> {
    Ok(())
}

impl Iterator for ZipCombine<'_> {
    type Item = Result<ChangeRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(record) => record.map(Ok),
            Err(e) => {
                // a failed rebuild never replaces the archive
                self.writer = None;
                self.members = Vec::new().into_iter();
                Some(Err(e))
            }
        }
    }
}
