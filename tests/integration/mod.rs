//! Integration tests for musdex
//!
//! Drives complete extract/combine/add/remove runs against real zip files
//! in a temporary working tree, with an in-memory version-control double.

use ::musdex::*;
use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Everything the in-memory VCS has seen
#[derive(Debug, Default)]
pub struct VcsState {
    pub tracked: BTreeSet<PathBuf>,
    pub added: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

/// Version-control double that keeps the tracked set in memory
///
/// Clones share state, so a test can keep one handle while the driver owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MemoryVcs {
    state: Rc<RefCell<VcsState>>,
}

impl MemoryVcs {
    /// Track a path without logging it as an add
    pub fn track(&self, path: impl Into<PathBuf>) {
        self.state.borrow_mut().tracked.insert(path.into());
    }

    pub fn is_tracked(&self, path: &str) -> bool {
        self.state.borrow().tracked.contains(Path::new(path))
    }

    pub fn added(&self) -> Vec<PathBuf> {
        self.state.borrow().added.clone()
    }

    pub fn removed(&self) -> Vec<PathBuf> {
        self.state.borrow().removed.clone()
    }
}

impl Vcs for MemoryVcs {
    fn tracked_files(&self) -> Result<Vec<PathBuf>> {
        Ok(self.state.borrow().tracked.iter().cloned().collect())
    }

    fn add_file(&self, path: &Path) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.tracked.insert(path.to_path_buf());
        state.added.push(path.to_path_buf());
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.tracked.remove(path);
        state.removed.push(path.to_path_buf());
        Ok(())
    }
}

/// A fixed point in time, `minute` minutes after 2023-03-01 10:00
pub fn stamp(minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 3, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
        + chrono::Duration::minutes(i64::from(minute))
}

/// Temporary working tree with a shared in-memory VCS
pub struct MusdexTestHarness {
    pub temp_dir: TempDir,
    pub vcs: MemoryVcs,
}

impl MusdexTestHarness {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
            vcs: MemoryVcs::default(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Build a driver; configuration is re-read every time
    pub fn musdex(&self) -> Musdex {
        MusdexBuilder::new()
            .vcs(Box::new(self.vcs.clone()))
            .build(self.root())
            .unwrap()
    }

    /// Write the configuration file directly
    pub fn configure(&self, config: &Config) {
        config.save(&self.path("_musdex/musdex.yaml")).unwrap();
    }

    /// Track the given archives with default settings
    pub fn configure_archives(&self, archives: &[&str]) {
        let mut config = Config::default();
        config.archives = archives.iter().map(|a| ArchiveEntry::new(*a)).collect();
        self.configure(&config);
    }

    /// Write a zip whose entries carry the given timestamps, then set the
    /// archive's own mtime
    pub fn write_zip(
        &self,
        name: &str,
        entries: &[(&str, &str, NaiveDateTime)],
        mtime: NaiveDateTime,
    ) -> anyhow::Result<()> {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        let mut writer = ZipWriter::new(file);
        for (entry, content, timestamp) in entries {
            let options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .last_modified_time(utils::to_zip_datetime(*timestamp));
            writer.start_file(entry.to_string(), options)?;
            writer.write_all(content.as_bytes())?;
        }
        writer.finish()?;
        utils::set_mtime(&path, mtime)?;
        Ok(())
    }

    /// Names and contents of every file in a zip
    pub fn read_zip(&self, name: &str) -> anyhow::Result<Vec<(String, String)>> {
        let path = self.path(name);
        let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
        let mut archive = ZipArchive::new(file)?;
        let mut entries = Vec::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let mut content = String::new();
            entry.read_to_string(&mut content)?;
            entries.push((entry.name().to_string(), content));
        }
        entries.sort();
        Ok(entries)
    }

    /// Write a file and give it a fixed mtime
    pub fn write_file(&self, relative: &str, content: &str, mtime: NaiveDateTime) {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        utils::set_mtime(&path, mtime).unwrap();
    }

    pub fn read_file(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    pub fn index(&self) -> TimestampIndex {
        self.musdex().load_index().unwrap()
    }
}

impl Default for MusdexTestHarness {
    fn default() -> Self {
        Self::new()
    }
}

fn paths(items: &[&str]) -> Vec<PathBuf> {
    items.iter().map(PathBuf::from).collect()
}

#[test]
fn test_first_extraction() -> anyhow::Result<()> {
    let harness = MusdexTestHarness::new();
    harness.write_zip("a.zip", &[("x.txt", "hello", stamp(1))], stamp(30))?;
    harness.configure_archives(&["a.zip"]);

    let report = harness.musdex().extract(&[], false).unwrap();

    assert_eq!(report.archives_processed, paths(&["a.zip"]));
    assert_eq!(report.files_written, 1);
    assert_eq!(report.vcs_added, 1);
    assert!(report.index_saved);
    assert_eq!(harness.read_file("_musdex/a.zip/x.txt"), "hello");
    assert_eq!(harness.vcs.added(), paths(&["_musdex/a.zip/x.txt"]));

    let index = harness.index();
    assert_eq!(index.get(Path::new("_musdex/a.zip/x.txt")), Some(stamp(1)));
    assert_eq!(index.get(Path::new("_musdex/a.zip")), Some(stamp(30)));
    Ok(())
}

#[test]
fn test_updated_entry_is_extracted_alone() -> anyhow::Result<()> {
    let harness = MusdexTestHarness::new();
    harness.write_zip(
        "a.zip",
        &[("x.txt", "one", stamp(1)), ("y.txt", "why", stamp(1))],
        stamp(30),
    )?;
    harness.configure_archives(&["a.zip"]);
    harness.musdex().extract(&[], false).unwrap();

    harness.write_zip(
        "a.zip",
        &[("x.txt", "two", stamp(2)), ("y.txt", "changed but old", stamp(1))],
        stamp(40),
    )?;
    let report = harness.musdex().extract(&[], false).unwrap();

    assert_eq!(report.files_written, 1);
    assert_eq!(report.vcs_added, 0);
    assert_eq!(harness.read_file("_musdex/a.zip/x.txt"), "two");
    // equal timestamps are not a change
    assert_eq!(harness.read_file("_musdex/a.zip/y.txt"), "why");

    let index = harness.index();
    assert_eq!(index.get(Path::new("_musdex/a.zip/x.txt")), Some(stamp(2)));
    assert_eq!(index.get(Path::new("_musdex/a.zip")), Some(stamp(40)));
    Ok(())
}

#[test]
fn test_extract_is_idempotent() -> anyhow::Result<()> {
    let harness = MusdexTestHarness::new();
    harness.write_zip("a.zip", &[("x.txt", "x", stamp(1))], stamp(30))?;
    harness.configure_archives(&["a.zip"]);

    harness.musdex().extract(&[], false).unwrap();
    let index_before = fs::read(harness.path("_musdex/.musdex.index.yaml")).unwrap();

    let report = harness.musdex().extract(&[], false).unwrap();
    assert!(!report.has_changes());
    assert_eq!(report.archives_skipped, paths(&["a.zip"]));
    assert_eq!(
        fs::read(harness.path("_musdex/.musdex.index.yaml")).unwrap(),
        index_before
    );
    Ok(())
}

#[test]
fn test_forced_extraction_rewrites_everything() -> anyhow::Result<()> {
    let harness = MusdexTestHarness::new();
    harness.write_zip("a.zip", &[("x.txt", "x", stamp(1))], stamp(30))?;
    harness.configure_archives(&["a.zip"]);
    harness.musdex().extract(&[], false).unwrap();

    fs::write(harness.path("_musdex/a.zip/x.txt"), "local edit").unwrap();
    let report = harness.musdex().extract(&[], true).unwrap();

    assert_eq!(report.files_written, 1);
    assert_eq!(harness.read_file("_musdex/a.zip/x.txt"), "x");
    Ok(())
}

#[test]
fn test_entry_removed_from_archive() -> anyhow::Result<()> {
    let harness = MusdexTestHarness::new();
    harness.write_zip(
        "a.zip",
        &[("x.txt", "x", stamp(1)), ("y.txt", "y", stamp(1))],
        stamp(30),
    )?;
    harness.configure_archives(&["a.zip"]);
    harness.musdex().extract(&[], false).unwrap();

    harness.write_zip("a.zip", &[("y.txt", "y", stamp(1))], stamp(40))?;
    let report = harness.musdex().extract(&[], false).unwrap();

    assert_eq!(report.files_removed, 1);
    assert_eq!(harness.vcs.removed(), paths(&["_musdex/a.zip/x.txt"]));
    assert!(!harness.vcs.is_tracked("_musdex/a.zip/x.txt"));

    let index = harness.index();
    assert!(!index.contains(Path::new("_musdex/a.zip/x.txt")));
    assert!(index.contains(Path::new("_musdex/a.zip/y.txt")));
    Ok(())
}

#[test]
fn test_forced_extraction_drops_entries_gone_from_archive() -> anyhow::Result<()> {
    let harness = MusdexTestHarness::new();
    harness.write_zip(
        "a.zip",
        &[("x.txt", "x", stamp(1)), ("y.txt", "y", stamp(1))],
        stamp(30),
    )?;
    harness.configure_archives(&["a.zip"]);
    harness.musdex().extract(&[], false)?;

    harness.write_zip("a.zip", &[("y.txt", "y", stamp(1))], stamp(40))?;
    let report = harness.musdex().extract(&[], true)?;

    assert_eq!(report.files_removed, 1);
    assert_eq!(report.files_written, 1);
    assert_eq!(harness.vcs.removed(), paths(&["_musdex/a.zip/x.txt"]));
    assert!(!harness.vcs.is_tracked("_musdex/a.zip/x.txt"));

    let index = harness.index();
    assert!(!index.contains(Path::new("_musdex/a.zip/x.txt")));
    assert_eq!(index.get(Path::new("_musdex/a.zip/y.txt")), Some(stamp(1)));
    Ok(())
}

#[test]
fn test_combine_skips_unchanged_directory() -> anyhow::Result<()> {
    let harness = MusdexTestHarness::new();
    harness.write_zip(
        "a.zip",
        &[("a.txt", "a", stamp(1)), ("b.txt", "b", stamp(1))],
        stamp(30),
    )?;
    harness.configure_archives(&["a.zip"]);
    harness.musdex().extract(&[], false).unwrap();
    let archive_before = fs::read(harness.path("a.zip")).unwrap();

    let report = harness.musdex().combine(&[], false).unwrap();

    assert_eq!(report.archives_skipped, paths(&["a.zip"]));
    assert!(!report.index_saved);
    assert_eq!(fs::read(harness.path("a.zip")).unwrap(), archive_before);
    assert!(!harness.path("a.zip.bak~").exists());
    Ok(())
}

#[test]
fn test_combine_rebuilds_after_local_edit() -> anyhow::Result<()> {
    let harness = MusdexTestHarness::new();
    harness.write_zip(
        "a.zip",
        &[("a.txt", "a", stamp(1)), ("b.txt", "b", stamp(1))],
        stamp(30),
    )?;
    harness.configure_archives(&["a.zip"]);
    harness.musdex().extract(&[], false).unwrap();

    harness.write_file("_musdex/a.zip/a.txt", "edited", stamp(50));
    let report = harness.musdex().combine(&[], false).unwrap();

    assert_eq!(report.archives_processed, paths(&["a.zip"]));
    // full rebuild: the untouched file is packed too
    assert_eq!(report.files_written, 2);
    assert!(report.index_saved);
    assert_eq!(
        harness.read_zip("a.zip")?,
        vec![
            ("a.txt".to_string(), "edited".to_string()),
            ("b.txt".to_string(), "b".to_string()),
        ]
    );
    assert!(!harness.path("a.zip.bak~").exists());

    let index = harness.index();
    assert_eq!(index.get(Path::new("_musdex/a.zip/a.txt")), Some(stamp(50)));
    assert_eq!(
        index.get(Path::new("a.zip")),
        Some(utils::mtime(&harness.path("a.zip")).unwrap())
    );

    // nothing changed since
    let report = harness.musdex().combine(&[], false).unwrap();
    assert_eq!(report.archives_skipped, paths(&["a.zip"]));
    Ok(())
}

#[test]
fn test_combine_then_extract_round_trip() {
    let source = MusdexTestHarness::new();
    source.write_file("_musdex/doc.zip/content.xml", "<doc/>", stamp(2));
    source.write_file("_musdex/doc.zip/media/pic.txt", "pixels", stamp(4));
    source.vcs.track("_musdex/doc.zip/content.xml");
    source.vcs.track("_musdex/doc.zip/media/pic.txt");

    let options = AddOptions {
        new: true,
        handler: None,
    };
    let report = source
        .musdex()
        .add(&paths(&["doc.zip"]), &options)
        .unwrap();
    assert_eq!(report.added, paths(&["doc.zip"]));
    assert_eq!(report.files, 2);

    let target = MusdexTestHarness::new();
    fs::copy(source.path("doc.zip"), target.path("doc.zip")).unwrap();
    target
        .musdex()
        .add(&paths(&["doc.zip"]), &AddOptions::default())
        .unwrap();

    assert_eq!(target.read_file("_musdex/doc.zip/content.xml"), "<doc/>");
    assert_eq!(target.read_file("_musdex/doc.zip/media/pic.txt"), "pixels");
    assert!(target.vcs.is_tracked("_musdex/doc.zip/media/pic.txt"));
    assert_eq!(
        target.index().get(Path::new("_musdex/doc.zip/media/pic.txt")),
        Some(stamp(4))
    );
}

#[test]
fn test_backup_left_when_configured() -> anyhow::Result<()> {
    let harness = MusdexTestHarness::new();
    harness.write_zip("a.zip", &[("a.txt", "a", stamp(1))], stamp(30))?;
    let original = fs::read(harness.path("a.zip")).unwrap();

    let mut config = Config::default();
    config.archives.push(ArchiveEntry::new("a.zip"));
    config.leave_backups = Some(true);
    harness.configure(&config);
    harness.musdex().extract(&[], false).unwrap();

    harness.musdex().combine(&[], true).unwrap();
    assert_eq!(fs::read(harness.path("a.zip.bak~")).unwrap(), original);
    Ok(())
}

#[test]
fn test_backup_disabled() -> anyhow::Result<()> {
    let harness = MusdexTestHarness::new();
    harness.write_zip("a.zip", &[("a.txt", "a", stamp(1))], stamp(30))?;

    let mut config = Config::default();
    config.archives.push(ArchiveEntry::new("a.zip"));
    config.backup = Some(false);
    config.leave_backups = Some(true);
    harness.configure(&config);
    harness.musdex().extract(&[], false).unwrap();

    harness.musdex().combine(&[], true).unwrap();
    assert!(!harness.path("a.zip.bak~").exists());
    Ok(())
}

#[test]
fn test_unknown_handler_leaves_no_backup() -> anyhow::Result<()> {
    let harness = MusdexTestHarness::new();
    harness.write_zip("a.zip", &[("a.txt", "a", stamp(1))], stamp(30))?;

    let mut entry = ArchiveEntry::new("a.zip");
    entry.handler = Some("rar".to_string());
    let mut config = Config::default();
    config.archives.push(entry);
    harness.configure(&config);

    let err = harness.musdex().combine(&[], true).unwrap_err();
    assert!(matches!(err, MusdexError::HandlerNotFound(ref name) if name == "rar"));
    assert!(!harness.path("a.zip.bak~").exists());
    Ok(())
}

#[test]
fn test_selection_limits_the_run() -> anyhow::Result<()> {
    let harness = MusdexTestHarness::new();
    harness.write_zip("a.zip", &[("a.txt", "a", stamp(1))], stamp(30))?;
    harness.write_zip("docs/b.zip", &[("b.txt", "b", stamp(1))], stamp(30))?;
    harness.configure_archives(&["a.zip", "docs/b.zip"]);

    let selected = vec![harness.path("docs/b.zip")];
    let report = harness.musdex().extract(&selected, false).unwrap();

    assert_eq!(report.archives_processed, paths(&["docs/b.zip"]));
    assert!(harness.path("_musdex/docs/b.zip/b.txt").exists());
    assert!(!harness.path("_musdex/a.zip").exists());
    Ok(())
}

#[test]
fn test_post_extract_formatter() -> anyhow::Result<()> {
    let harness = MusdexTestHarness::new();
    harness.write_zip(
        "a.zip",
        &[("x.txt", "one\r\ntwo\r\n", stamp(1)), ("x.bin", "keep\r\n", stamp(1))],
        stamp(30),
    )?;

    let mut config = Config::default();
    config.archives.push(ArchiveEntry::new("a.zip"));
    config
        .post_extract
        .push(PostExtractRule(r".*\.txt$".to_string(), "removecrs".to_string()));
    harness.configure(&config);

    harness.musdex().extract(&[], false).unwrap();
    assert_eq!(harness.read_file("_musdex/a.zip/x.txt"), "one\ntwo\n");
    assert_eq!(harness.read_file("_musdex/a.zip/x.bin"), "keep\r\n");
    Ok(())
}

#[test]
fn test_staleness_policies_are_asymmetric() -> anyhow::Result<()> {
    let harness = MusdexTestHarness::new();
    harness.write_zip("a.zip", &[("a.txt", "a", stamp(1))], stamp(30))?;
    harness.configure_archives(&["a.zip"]);
    harness.musdex().extract(&[], false).unwrap();

    // a tracked member the index has never seen
    harness.write_file("_musdex/a.zip/new.txt", "new", stamp(2));
    harness.vcs.track("_musdex/a.zip/new.txt");

    // extract only looks at the directory marker against the archive mtime
    let report = harness.musdex().extract(&[], false).unwrap();
    assert_eq!(report.archives_skipped, paths(&["a.zip"]));

    // combine treats the never-indexed member as a change
    let report = harness.musdex().combine(&[], false).unwrap();
    assert_eq!(report.archives_processed, paths(&["a.zip"]));
    assert_eq!(report.files_written, 2);
    Ok(())
}

#[test]
fn test_add_existing_archive() -> anyhow::Result<()> {
    let harness = MusdexTestHarness::new();
    harness.write_zip(
        "a.zip",
        &[("x.txt", "x", stamp(1)), ("sub/y.txt", "y", stamp(2))],
        stamp(30),
    )?;

    let mut musdex = harness.musdex();
    let report = musdex.add(&paths(&["a.zip"]), &AddOptions::default()).unwrap();

    assert_eq!(report.added, paths(&["a.zip"]));
    assert_eq!(report.files, 2);
    assert!(musdex.config().is_configured(Path::new("a.zip")));
    assert!(harness.vcs.is_tracked("_musdex/a.zip/sub/y.txt"));
    assert!(harness.vcs.is_tracked("_musdex/musdex.yaml"));
    assert!(!harness.vcs.is_tracked("_musdex/a.zip"));

    let index = harness.index();
    assert_eq!(index.get(Path::new("_musdex/a.zip")), Some(stamp(30)));

    // a second add is skipped, not an error
    let report = harness
        .musdex()
        .add(&paths(&["a.zip"]), &AddOptions::default())
        .unwrap();
    assert!(report.added.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(harness.musdex().config().archives.len(), 1);
    Ok(())
}

#[test]
fn test_add_rejects_non_archive() -> anyhow::Result<()> {
    let harness = MusdexTestHarness::new();
    harness.write_zip("good.zip", &[("x.txt", "x", stamp(1))], stamp(30))?;
    fs::write(harness.path("notes.txt"), "plain text").unwrap();

    let report = harness
        .musdex()
        .add(&paths(&["notes.txt", "good.zip"]), &AddOptions::default())
        .unwrap();

    assert_eq!(report.added, paths(&["good.zip"]));
    assert_eq!(report.skipped[0].0, PathBuf::from("notes.txt"));
    assert!(!harness.musdex().config().is_configured(Path::new("notes.txt")));
    Ok(())
}

#[test]
fn test_add_with_unknown_handler() {
    let harness = MusdexTestHarness::new();
    let options = AddOptions {
        new: false,
        handler: Some("tarball".to_string()),
    };
    let err = harness
        .musdex()
        .add(&paths(&["a.tar"]), &options)
        .unwrap_err();
    assert!(matches!(err, MusdexError::HandlerNotFound(_)));
}

#[test]
fn test_add_new_creates_directory_and_archive() -> anyhow::Result<()> {
    let harness = MusdexTestHarness::new();
    let options = AddOptions {
        new: true,
        handler: Some("zip".to_string()),
    };

    let mut musdex = harness.musdex();
    musdex.add(&paths(&["fresh.zip"]), &options).unwrap();

    assert!(harness.path("_musdex/fresh.zip").is_dir());
    assert!(harness.vcs.is_tracked("_musdex/fresh.zip"));
    assert!(harness.read_zip("fresh.zip")?.is_empty());
    assert_eq!(
        musdex.config().archive(Path::new("fresh.zip")).unwrap().handler.as_deref(),
        Some("zip")
    );

    // the new directory and archive are in sync
    let report = harness.musdex().combine(&[], false).unwrap();
    assert_eq!(report.archives_skipped, paths(&["fresh.zip"]));
    Ok(())
}

#[test]
fn test_remove_archive() -> anyhow::Result<()> {
    let harness = MusdexTestHarness::new();
    harness.write_zip(
        "a.zip",
        &[("x.txt", "x", stamp(1)), ("y.txt", "y", stamp(1))],
        stamp(30),
    )?;
    harness
        .musdex()
        .add(&paths(&["a.zip"]), &AddOptions::default())
        .unwrap();

    let mut musdex = harness.musdex();
    let report = musdex.remove(&paths(&["a.zip", "other.zip"])).unwrap();

    assert_eq!(report.removed, paths(&["a.zip"]));
    assert_eq!(report.skipped, paths(&["other.zip"]));
    assert_eq!(report.files_removed, 2);
    assert!(musdex.config().archives.is_empty());
    assert!(!harness.vcs.is_tracked("_musdex/a.zip/x.txt"));
    // the archive itself stays
    assert!(harness.path("a.zip").exists());

    let index = harness.index();
    assert!(index.is_empty());
    Ok(())
}

#[test]
fn test_remove_without_configuration() {
    let harness = MusdexTestHarness::new();
    let err = harness
        .musdex()
        .remove(&paths(&["a.zip"]))
        .unwrap_err();
    assert!(matches!(err, MusdexError::NoArchivesConfigured));
}

#[test]
fn test_missing_archive_is_an_error() {
    let harness = MusdexTestHarness::new();
    harness.configure_archives(&["missing.zip"]);

    let err = harness.musdex().extract(&[], false).unwrap_err();
    assert!(matches!(err, MusdexError::FileAccess { .. }));
    assert!(!harness.path("_musdex/.musdex.index.yaml").exists());
}

#[test]
fn test_custom_index_location() -> anyhow::Result<()> {
    let harness = MusdexTestHarness::new();
    harness.write_zip("a.zip", &[("x.txt", "x", stamp(1))], stamp(30))?;

    let mut config = Config::default();
    config.archives.push(ArchiveEntry::new("a.zip"));
    config.index = Some(PathBuf::from("state/index.yaml"));
    harness.configure(&config);

    harness.musdex().extract(&[], false).unwrap();
    assert!(harness.path("state/index.yaml").exists());
    assert!(!harness.path("_musdex/.musdex.index.yaml").exists());
    Ok(())
}
