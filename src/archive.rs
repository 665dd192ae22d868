//! Archive handlers and their registry
//!
//! An [`ArchiveHandler`] binds one archive, its extraction directory and the
//! sub-manifest of that directory. It knows how to validate the archive,
//! unpack it into the directory, and pack the directory back into it. Both
//! directions report what they touched as a lazy stream of
//! [`ChangeRecord`]s that the driver applies one at a time.
//!
//! Handlers are looked up by name. The only built-in one is `zip`, which is
//! also used when an archive entry names no handler.

use crate::error::{MusdexError, Result};
use crate::types::{ChangeRecord, SubManifest};
use crate::zip_handler::ZipHandler;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::trace;

/// Name of the handler used when none is configured
pub const DEFAULT_HANDLER: &str = "zip";

/// Lazy stream of changes produced by a handler
///
/// The stream ends after the first `Err`.
pub type Changes<'a> = Box<dyn Iterator<Item = Result<ChangeRecord>> + 'a>;

/// Everything a handler is bound to
///
/// `archive` and `location` are relative to `root`, as are the sub-manifest
/// paths.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    /// Working tree root
    pub root: PathBuf,
    /// Archive file
    pub archive: PathBuf,
    /// Extraction directory
    pub location: PathBuf,
    /// Tracked files under `location` with their indexed timestamps
    pub manifest: SubManifest,
}

impl HandlerContext {
    /// Archive path on disk
    pub fn archive_path(&self) -> PathBuf {
        self.root.join(&self.archive)
    }

    /// Extraction directory on disk
    pub fn location_path(&self) -> PathBuf {
        self.root.join(&self.location)
    }
}

/// Extract/combine strategy for one archive format
pub trait ArchiveHandler {
    /// Whether the archive is readable by this handler
    fn check(&self) -> Result<bool>;

    /// Unpack the archive into the extraction directory
    ///
    /// With `force` every entry is written; otherwise only entries that are
    /// new or strictly newer than their indexed timestamp. Members of the
    /// sub-manifest missing from the archive are reported as removed. The
    /// last record is always the extraction directory, carrying the archive
    /// file's mtime.
    fn extract(&self, force: bool) -> Result<Changes<'_>>;

    /// Pack the sub-manifest back into the archive
    ///
    /// Each packed file is reported with its on-disk mtime. The last record
    /// is always the archive itself, carrying its new mtime. Removal records
    /// are dropped from the index and from version control, as on extract.
    fn combine(&self, force: bool) -> Result<Changes<'_>>;
}

/// Builds a handler bound to a context
pub type HandlerConstructor = fn(HandlerContext) -> Box<dyn ArchiveHandler>;

fn zip_handler(ctx: HandlerContext) -> Box<dyn ArchiveHandler> {
    Box::new(ZipHandler::new(ctx))
}

fn registry() -> &'static HashMap<&'static str, HandlerConstructor> {
    static REGISTRY: OnceLock<HashMap<&'static str, HandlerConstructor>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut handlers: HashMap<&'static str, HandlerConstructor> = HashMap::new();
        handlers.insert(DEFAULT_HANDLER, zip_handler as HandlerConstructor);
        handlers
    })
}

/// Look up a handler constructor by name
///
/// `None` selects the default zip handler.
///
/// # Errors
///
/// - [`MusdexError::HandlerNotFound`] if no handler has that name
pub fn resolve_handler(name: Option<&str>) -> Result<HandlerConstructor> {
    let name = name.unwrap_or(DEFAULT_HANDLER);
    trace!("Resolving archive handler '{}'", name);
    registry()
        .get(name)
        .copied()
        .ok_or_else(|| MusdexError::HandlerNotFound(name.to_string()))
}

/// Names of all registered handlers, sorted
pub fn handler_names() -> Vec<&'static str> {
    let mut names: Vec<_> = registry().keys().copied().collect();
    names.sort_unstable();
    names
}
