//! Configuration: on-disk layout and the YAML configuration record
//!
//! [`Layout`] holds the fixed locations musdex works with (working tree
//! root, base directory, configuration file, default index file). It is
//! built once at startup and passed everywhere by reference.
//!
//! [`Config`] is the human-editable YAML file, by default
//! `_musdex/musdex.yaml`:
//!
//! ```yaml
//! archives:
//!   - filename: docs/report.docx
//!   - filename: slides.odp
//!     handler: zip
//! backup: true
//! leave_backups: false
//! vcs_add: git add
//! vcs_remove: git rm --cached -q
//! vcs_show_files: git ls-files
//! post_extract:
//!   - ['.*\.xml$', xmllint]
//! ```

use crate::error::{MusdexError, Result};
use crate::utils;
use crate::vcs::VcsCommands;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory holding the configuration, the index and every extraction directory
pub const BASE_DIR: &str = "_musdex";

/// Configuration file name inside [`BASE_DIR`]
pub const CONFIG_FILE: &str = "musdex.yaml";

/// Index file name inside [`BASE_DIR`]
pub const INDEX_FILE: &str = ".musdex.index.yaml";

/// Fixed on-disk locations
///
/// All paths except `root` are relative to `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
    base_dir: PathBuf,
    config_file: PathBuf,
    default_index: PathBuf,
}

impl Layout {
    /// Standard layout for a working tree
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let base_dir = PathBuf::from(BASE_DIR);
        Layout {
            root: root.into(),
            config_file: base_dir.join(CONFIG_FILE),
            default_index: base_dir.join(INDEX_FILE),
            base_dir,
        }
    }

    /// Use a different configuration file (relative to root, or absolute)
    pub fn with_config_file(mut self, config_file: impl Into<PathBuf>) -> Self {
        self.config_file = config_file.into();
        self
    }

    /// Working tree root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Base directory, relative to root
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Configuration file, relative to root
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Index file used when the configuration does not override it
    pub fn default_index(&self) -> &Path {
        &self.default_index
    }

    /// Extraction directory of an archive: `base_dir/archive`
    pub fn extraction_dir(&self, archive: &Path) -> PathBuf {
        self.base_dir.join(archive)
    }

    /// Resolve a root-relative path on disk
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

/// One tracked archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Archive path relative to the working tree root
    pub filename: PathBuf,
    /// Handler name; the zip handler when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
}

impl ArchiveEntry {
    /// Entry using the default handler
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        ArchiveEntry {
            filename: filename.into(),
            handler: None,
        }
    }
}

/// A `(regex, formatter)` pair from `post_extract`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostExtractRule(pub String, pub String);

impl PostExtractRule {
    /// Regular expression matched against extracted paths
    pub fn pattern(&self) -> &str {
        &self.0
    }

    /// Formatter to run on matching files
    pub fn formatter(&self) -> &str {
        &self.1
    }
}

/// The YAML configuration record
///
/// Keys that are absent stay absent when the file is saved again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tracked archives, processed in this order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub archives: Vec<ArchiveEntry>,

    /// Override for the index file location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<PathBuf>,

    /// Command template used to add a file to version control
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcs_add: Option<String>,

    /// Command template used to remove a file from version control
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcs_remove: Option<String>,

    /// Command listing every tracked file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcs_show_files: Option<String>,

    /// Back up an archive before combine rewrites it (default true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<bool>,

    /// Keep the backup after a successful combine (default false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leave_backups: Option<bool>,

    /// Formatters to run on extracted files whose path matches
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub post_extract: Vec<PostExtractRule>,
}

impl Config {
    /// Load configuration from `path`
    ///
    /// A missing or empty file yields the default configuration.
    ///
    /// # Errors
    ///
    /// - [`MusdexError::Yaml`] if the file is not valid YAML for this record
    /// - [`MusdexError::InvalidConfiguration`] if validation fails
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        if !path.exists() {
            info!("No configuration file found at {}", path.display());
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| MusdexError::file_access(path, e))?;
        let config = if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`, creating its directory if needed
    ///
    /// Returns `true` when the file did not exist before.
    pub fn save(&self, path: &Path) -> Result<bool> {
        debug!("Saving configuration to {}", path.display());
        let created = !path.exists();
        let yaml = serde_yaml::to_string(self)?;
        utils::atomic_write(path, yaml.as_bytes())?;
        Ok(created)
    }

    /// Check the record for mistakes that would break a run
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for (idx, archive) in self.archives.iter().enumerate() {
            if archive.filename.as_os_str().is_empty() {
                return Err(MusdexError::invalid_configuration(format!(
                    "archive #{} has an empty filename",
                    idx + 1
                )));
            }
            if !seen.insert(&archive.filename) {
                return Err(MusdexError::invalid_configuration(format!(
                    "archive {:?} is listed more than once",
                    archive.filename
                )));
            }
        }

        for rule in &self.post_extract {
            regex::Regex::new(rule.pattern())?;
            if rule.formatter().trim().is_empty() {
                return Err(MusdexError::invalid_configuration(format!(
                    "post_extract rule '{}' names no formatter",
                    rule.pattern()
                )));
            }
        }

        Ok(())
    }

    /// Find the entry of a tracked archive
    pub fn archive(&self, filename: &Path) -> Option<&ArchiveEntry> {
        self.archives.iter().find(|a| a.filename == filename)
    }

    /// Whether the archive is tracked
    pub fn is_configured(&self, filename: &Path) -> bool {
        self.archive(filename).is_some()
    }

    /// Index file for this configuration
    pub fn index_file(&self, layout: &Layout) -> PathBuf {
        self.index
            .clone()
            .unwrap_or_else(|| layout.default_index().to_path_buf())
    }

    /// Whether combine backs up the archive first
    pub fn backup_enabled(&self) -> bool {
        self.backup.unwrap_or(true)
    }

    /// Whether combine keeps its backup afterwards
    pub fn keep_backups(&self) -> bool {
        self.leave_backups.unwrap_or(false)
    }

    /// VCS command templates, with defaults for missing keys
    pub fn vcs_commands(&self) -> VcsCommands {
        let defaults = VcsCommands::default();
        VcsCommands {
            add: self.vcs_add.clone().unwrap_or(defaults.add),
            remove: self.vcs_remove.clone().unwrap_or(defaults.remove),
            show_files: self.vcs_show_files.clone().unwrap_or(defaults.show_files),
        }
    }
}
