//! # musdex - VCS-aware zip archives
//!
//! Keeps zip-based documents (`.docx`, `.odt`, `.xlsx`, plain `.zip`, ...)
//! and an exploded, version-controlled copy of their contents in sync.
//!
//! ## Overview
//!
//! Binary archives diff badly. musdex extracts every tracked archive into
//! `_musdex/<archive path>/` so that version control sees the individual
//! members, and packs edited members back into the archive when asked:
//!
//! - **Extract** (archive → directory): writes entries that are new or newer
//!   than the last extraction, and drops files that vanished from the archive
//! - **Combine** (directory → archive): rebuilds the archive from the tracked
//!   files when any of them changed on disk
//!
//! Change detection relies on modification timestamps only. A persisted
//! timestamp index remembers what was seen last time; the version-control
//! system supplies the list of files that belong to each directory.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use musdex::{AddOptions, MusdexBuilder};
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut musdex = MusdexBuilder::new().build(".")?;
//!
//! // Track a document; it is extracted into _musdex/report.docx/
//! musdex.add(&[PathBuf::from("report.docx")], &AddOptions::default())?;
//!
//! // ... edit _musdex/report.docx/word/document.xml ...
//!
//! // Pack the edits back into report.docx
//! let report = musdex.combine(&[], false)?;
//! println!("Packed {} files", report.files_written);
//! # Ok(())
//! # }
//! ```
//!
//! ## Layout
//!
//! ```text
//! <root>/
//!   report.docx
//!   _musdex/
//!     musdex.yaml            configuration
//!     .musdex.index.yaml     timestamp index
//!     report.docx/           extraction directory
//!       word/document.xml
//! ```
//!
//! ## Module Organization
//!
//! - [`musdex`]: the reconciliation driver and its builder
//! - [`archive`]: handler trait and registry
//! - [`zip_handler`]: the built-in zip handler
//! - [`index`]: the timestamp index
//! - [`vcs`]: version-control adapter
//! - [`formatter`]: post-extraction formatters
//! - [`config`]: layout and configuration file
//! - [`types`]: change records, sub-manifests and reports
//! - [`error`]: error types and handling

pub mod archive;
pub mod config;
pub mod error;
pub mod formatter;
pub mod index;
pub mod musdex;
pub mod types;
pub mod utils;
pub mod vcs;
pub mod zip_handler;

// Re-export main types for convenience
pub use archive::{resolve_handler, ArchiveHandler, Changes, HandlerContext};
pub use config::{ArchiveEntry, Config, Layout, PostExtractRule};
pub use error::{MusdexError, Result};
pub use index::TimestampIndex;
pub use musdex::{Musdex, MusdexBuilder};
pub use types::*;
pub use vcs::{CommandVcs, Vcs, VcsCommands};
pub use zip_handler::ZipHandler;
