//! Reconciliation driver
//!
//! [`Musdex`] ties the pieces together. For every configured archive it
//! checks staleness against the timestamp index, builds the sub-manifest of
//! the extraction directory from the VCS listing, runs the archive handler
//! and applies the change stream to the index and to version control. The
//! index is written back once per command, and only if it changed.
//!
//! ## Example
//!
//! ```rust,no_run
//! use musdex::MusdexBuilder;
//!
//! # fn main() -> musdex::Result<()> {
//! let musdex = MusdexBuilder::new().build(".")?;
//! let report = musdex.extract(&[], false)?;
//! println!("{} files extracted", report.files_written);
//! # Ok(())
//! # }
//! ```

use crate::archive::{resolve_handler, ArchiveHandler, HandlerConstructor, HandlerContext};
use crate::config::{ArchiveEntry, Config, Layout};
use crate::error::{MusdexError, Result};
use crate::formatter::PostExtract;
use crate::index::TimestampIndex;
use crate::types::{
    AddOptions, AddReport, ChangeRecord, EntryState, RemoveReport, SubManifest, SyncReport,
};
use crate::utils;
use crate::vcs::{CommandVcs, Vcs};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};

/// Suffix appended to an archive's file name for its pre-combine backup
pub const BACKUP_SUFFIX: &str = ".bak~";

/// Builder for [`Musdex`]
pub struct MusdexBuilder {
    config_file: Option<PathBuf>,
    vcs: Option<Box<dyn Vcs>>,
}

impl MusdexBuilder {
    /// Create a builder using the default configuration file and the
    /// command-line VCS adapter
    pub fn new() -> Self {
        Self {
            config_file: None,
            vcs: None,
        }
    }

    /// Use a different configuration file
    ///
    /// Relative paths are resolved against the working tree root.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Use a custom version-control adapter instead of running commands
    pub fn vcs(mut self, vcs: Box<dyn Vcs>) -> Self {
        self.vcs = Some(vcs);
        self
    }

    /// Load the configuration and build the driver for `root`
    ///
    /// # Errors
    ///
    /// - [`MusdexError::Yaml`] or [`MusdexError::InvalidConfiguration`] if
    ///   the configuration file is broken
    pub fn build(self, root: impl Into<PathBuf>) -> Result<Musdex> {
        let mut layout = Layout::new(root);
        if let Some(config_file) = self.config_file {
            layout = layout.with_config_file(config_file);
        }

        let config = Config::load(&layout.resolve(layout.config_file()))?;
        let vcs = match self.vcs {
            Some(vcs) => vcs,
            None => Box::new(CommandVcs::new(layout.root(), config.vcs_commands())),
        };

        Ok(Musdex {
            layout,
            config,
            vcs,
        })
    }
}

impl Default for MusdexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps tracked archives and their extraction directories in sync
pub struct Musdex {
    layout: Layout,
    config: Config,
    vcs: Box<dyn Vcs>,
}

impl std::fmt::Debug for Musdex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Musdex")
            .field("layout", &self.layout)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Musdex {
    /// On-disk layout
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Loaded configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Path of the index file on disk
    pub fn index_path(&self) -> PathBuf {
        self.layout.resolve(&self.config.index_file(&self.layout))
    }

    /// Load the timestamp index
    pub fn load_index(&self) -> Result<TimestampIndex> {
        TimestampIndex::load(&self.index_path())
    }

    /// Unpack archives that changed since their last extraction
    ///
    /// `selected` limits the run to the given archives; an empty slice
    /// selects every configured archive. With `force` the staleness check is
    /// skipped and every entry is written.
    #[instrument(skip(self, selected), fields(selected = selected.len()))]
    pub fn extract(&self, selected: &[PathBuf], force: bool) -> Result<SyncReport> {
        let mut index = self.load_index()?;
        let post_extract = PostExtract::compile(&self.config.post_extract)?;
        let archives = self.select(selected)?;
        let tracked = self.vcs.tracked_files()?;
        let mut report = SyncReport::default();

        for entry in archives {
            let archive = &entry.filename;
            let location = self.layout.extraction_dir(archive);

            if !force {
                if let Some(indexed) = index.get(&location) {
                    let current = utils::mtime(&self.layout.resolve(archive))?;
                    if current <= indexed {
                        debug!("{} is up to date", archive.display());
                        report.archives_skipped.push(archive.clone());
                        continue;
                    }
                }
            }

            let manifest = SubManifest::build(&tracked, &location, |path| index.get(path));
            let known: BTreeSet<PathBuf> = manifest.paths().cloned().collect();
            let handler = self.handler(entry, &location, manifest)?;
            let full = force || !index.contains(&location);

            info!(
                "{} {}",
                if full { "Extracting all of" } else { "Selectively extracting" },
                archive.display()
            );
            for record in handler.extract(full)? {
                self.apply_extracted(
                    record?,
                    &location,
                    &known,
                    &post_extract,
                    &mut index,
                    &mut report,
                )?;
            }
            report.archives_processed.push(archive.clone());
        }

        report.index_saved = index.save_if_dirty()?;
        Ok(report)
    }

    /// Pack extraction directories whose files changed back into their archives
    ///
    /// Every combine is a full rebuild of the archive. With `force` the
    /// staleness check is skipped.
    #[instrument(skip(self, selected), fields(selected = selected.len()))]
    pub fn combine(&self, selected: &[PathBuf], force: bool) -> Result<SyncReport> {
        let mut index = self.load_index()?;
        let archives = self.select(selected)?;
        let tracked = self.vcs.tracked_files()?;
        let mut report = SyncReport::default();

        for entry in archives {
            let archive = &entry.filename;
            let location = self.layout.extraction_dir(archive);
            let manifest = SubManifest::build(&tracked, &location, |path| index.get(path));

            debug!("Checking modification times for {}", archive.display());
            let first_time = !index.contains(&location);
            if !force && !first_time && !manifest.has_changes_on_disk(self.layout.root())? {
                debug!("{} has no changes to combine", archive.display());
                report.archives_skipped.push(archive.clone());
                continue;
            }

            let handler = self.handler(entry, &location, manifest)?;
            let archive_path = self.layout.resolve(archive);
            let backup = if self.config.backup_enabled() && archive_path.exists() {
                Some(backup_archive(&archive_path)?)
            } else {
                None
            };

            info!("Combining {}", archive.display());
            for record in handler.combine(force || first_time)? {
                let record = record?;
                if record.is_removal() {
                    report.files_removed += 1;
                } else if &record.path != archive {
                    report.files_written += 1;
                }
                self.apply_combined(&record, &mut index)?;
            }
            report.archives_processed.push(archive.clone());

            if let Some(backup) = backup {
                if self.config.keep_backups() {
                    debug!("Leaving backup {}", backup.display());
                } else {
                    debug!("Removing backup {}", backup.display());
                    fs::remove_file(&backup).map_err(|e| MusdexError::file_access(&backup, e))?;
                }
            }
        }

        report.index_saved = index.save_if_dirty()?;
        Ok(report)
    }

    /// Start tracking archives
    ///
    /// Without `new`, each archive must already exist and is extracted in
    /// full. With `new`, the extraction directory is created if needed and
    /// packed into a fresh archive. Archives that are already configured, or
    /// that the handler cannot read, are skipped with a log message.
    #[instrument(skip(self, archives, options))]
    pub fn add(&mut self, archives: &[PathBuf], options: &AddOptions) -> Result<AddReport> {
        let mut index = self.load_index()?;
        let post_extract = PostExtract::compile(&self.config.post_extract)?;
        let constructor = resolve_handler(options.handler.as_deref())?;
        let mut report = AddReport::default();

        for given in archives {
            let archive = utils::relative_to_root(self.layout.root(), given)?;
            match self.add_one(&archive, options, constructor, &post_extract, &mut index) {
                Ok(files) => {
                    let mut entry = ArchiveEntry::new(archive.clone());
                    entry.handler = options.handler.clone();
                    self.config.archives.push(entry);
                    report.added.push(archive);
                    report.files += files;
                }
                Err(e) if !e.is_fatal() => {
                    if matches!(e, MusdexError::NotAnArchive { .. }) {
                        error!("{}", e);
                    } else {
                        warn!("{}", e);
                    }
                    report.skipped.push((archive, e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        self.save_config()?;
        index.save()?;
        Ok(report)
    }

    /// Stop tracking archives
    ///
    /// Every tracked file of the extraction directory is removed from
    /// version control and from the index. The archive file itself is left
    /// alone.
    #[instrument(skip(self, archives))]
    pub fn remove(&mut self, archives: &[PathBuf]) -> Result<RemoveReport> {
        if self.config.archives.is_empty() {
            return Err(MusdexError::NoArchivesConfigured);
        }

        let mut index = self.load_index()?;
        let tracked = self.vcs.tracked_files()?;
        let mut report = RemoveReport::default();

        for given in archives {
            let archive = utils::relative_to_root(self.layout.root(), given)?;
            if !self.config.is_configured(&archive) {
                warn!("{}", MusdexError::ArchiveNotConfigured(archive.clone()));
                report.skipped.push(archive);
                continue;
            }

            info!("Removing files of {} from version control", archive.display());
            let location = self.layout.extraction_dir(&archive);
            for path in tracked.iter().filter(|path| path.starts_with(&location)) {
                self.vcs.remove_file(path)?;
                index.remove(path);
                report.files_removed += 1;
            }
            index.remove(&location);
            index.remove(&archive);

            self.config.archives.retain(|entry| entry.filename != archive);
            report.removed.push(archive);
        }

        self.save_config()?;
        index.save()?;
        Ok(report)
    }

    fn add_one(
        &self,
        archive: &Path,
        options: &AddOptions,
        constructor: HandlerConstructor,
        post_extract: &PostExtract,
        index: &mut TimestampIndex,
    ) -> Result<usize> {
        if self.config.is_configured(archive) {
            return Err(MusdexError::ArchiveAlreadyConfigured(archive.to_path_buf()));
        }

        let location = self.layout.extraction_dir(archive);
        let location_path = self.layout.resolve(&location);
        let mut files = 0;

        if options.new {
            if !location_path.exists() {
                fs::create_dir_all(&location_path)
                    .map_err(|e| MusdexError::file_access(&location_path, e))?;
                self.vcs.add_file(&location)?;
            }

            let tracked = self.vcs.tracked_files()?;
            let manifest = SubManifest::build(&tracked, &location, |path| index.get(path));
            let handler = constructor(self.context(archive, &location, manifest));

            info!("Creating {} from {}", archive.display(), location.display());
            for record in handler.combine(true)? {
                let record = record?;
                if record.path == archive {
                    // the directory and the fresh archive are now in sync
                    if let Some(timestamp) = record.timestamp() {
                        index.upsert(&location, timestamp);
                    }
                } else {
                    files += 1;
                }
                self.apply_combined(&record, index)?;
            }
        } else {
            let handler = constructor(self.context(archive, &location, SubManifest::new()));
            if !handler.check()? {
                return Err(MusdexError::NotAnArchive {
                    path: archive.to_path_buf(),
                    handler: options
                        .handler
                        .clone()
                        .unwrap_or_else(|| crate::archive::DEFAULT_HANDLER.to_string()),
                });
            }

            info!("Extracting archive for the first time: {}", archive.display());
            for record in handler.extract(true)? {
                let record = record?;
                let Some(timestamp) = record.timestamp() else {
                    continue;
                };
                index.upsert(&record.path, timestamp);
                if record.path != location {
                    post_extract.apply(self.layout.root(), &record.path)?;
                    self.vcs.add_file(&record.path)?;
                    files += 1;
                }
            }
        }

        Ok(files)
    }

    fn apply_extracted(
        &self,
        record: ChangeRecord,
        location: &Path,
        known: &BTreeSet<PathBuf>,
        post_extract: &PostExtract,
        index: &mut TimestampIndex,
        report: &mut SyncReport,
    ) -> Result<()> {
        match record.state {
            EntryState::Removed => {
                debug!("Removing {}", record.path.display());
                index.remove(&record.path);
                self.vcs.remove_file(&record.path)?;
                report.files_removed += 1;
            }
            EntryState::Modified(timestamp) => {
                index.upsert(&record.path, timestamp);
                if record.path != location {
                    report.files_written += 1;
                    post_extract.apply(self.layout.root(), &record.path)?;
                    if !known.contains(&record.path) {
                        self.vcs.add_file(&record.path)?;
                        report.vcs_added += 1;
                    }
                }
            }
        }
        Ok(())
    }

    fn select(&self, selected: &[PathBuf]) -> Result<Vec<&ArchiveEntry>> {
        if selected.is_empty() {
            return Ok(self.config.archives.iter().collect());
        }

        let wanted = selected
            .iter()
            .map(|path| utils::relative_to_root(self.layout.root(), path))
            .collect::<Result<BTreeSet<_>>>()?;
        for path in &wanted {
            if !self.config.is_configured(path) {
                warn!("{}", MusdexError::ArchiveNotConfigured(path.clone()));
            }
        }

        Ok(self
            .config
            .archives
            .iter()
            .filter(|entry| wanted.contains(&entry.filename))
            .collect())
    }

    fn context(&self, archive: &Path, location: &Path, manifest: SubManifest) -> HandlerContext {
        HandlerContext {
            root: self.layout.root().to_path_buf(),
            archive: archive.to_path_buf(),
            location: location.to_path_buf(),
            manifest,
        }
    }

    fn handler(
        &self,
        entry: &ArchiveEntry,
        location: &Path,
        manifest: SubManifest,
    ) -> Result<Box<dyn ArchiveHandler>> {
        let constructor = resolve_handler(entry.handler.as_deref())?;
        Ok(constructor(self.context(&entry.filename, location, manifest)))
    }

    fn apply_combined(&self, record: &ChangeRecord, index: &mut TimestampIndex) -> Result<()> {
        match record.state {
            EntryState::Modified(timestamp) => index.upsert(&record.path, timestamp),
            EntryState::Removed => {
                debug!("Removing {}", record.path.display());
                index.remove(&record.path);
                self.vcs.remove_file(&record.path)?;
            }
        }
        Ok(())
    }

    fn save_config(&self) -> Result<()> {
        let config_file = self.layout.config_file();
        if self.config.save(&self.layout.resolve(config_file))? {
            info!("Adding new configuration file to vcs: {}", config_file.display());
            self.vcs.add_file(config_file)?;
        }
        Ok(())
    }
}

/// Path of an archive's backup file
pub fn backup_path(archive: &Path) -> PathBuf {
    let mut name: OsString = archive.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(BACKUP_SUFFIX);
    archive.with_file_name(name)
}

fn backup_archive(archive: &Path) -> Result<PathBuf> {
    let backup = backup_path(archive);
    debug!("Backing up {} to {}", archive.display(), backup.display());
    fs::copy(archive, &backup).map_err(|e| MusdexError::file_access(&backup, e))?;
    Ok(backup)
}
