//! Post-extraction formatters
//!
//! A formatter rewrites one freshly extracted file in place, usually to make
//! it friendlier to line-based diffs. Formatters are picked by the
//! `post_extract` rules of the configuration: every rule whose pattern
//! matches the file's root-relative path runs its formatter, in rule order.

use crate::config::PostExtractRule;
use crate::error::{MusdexError, Result};
use crate::utils;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// In-place transform of one file, given its path on disk
pub type Formatter = fn(&Path) -> Result<()>;

fn registry() -> &'static HashMap<&'static str, Formatter> {
    static REGISTRY: OnceLock<HashMap<&'static str, Formatter>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut formatters: HashMap<&'static str, Formatter> = HashMap::new();
        formatters.insert("xmllint", xmllint as Formatter);
        formatters.insert("removecrs", remove_crs as Formatter);
        formatters
    })
}

/// Look up a formatter by name
///
/// # Errors
///
/// - [`MusdexError::FormatterNotFound`] if no formatter has that name
pub fn resolve_formatter(name: &str) -> Result<Formatter> {
    registry()
        .get(name)
        .copied()
        .ok_or_else(|| MusdexError::FormatterNotFound(name.to_string()))
}

/// Pretty-print an XML file with `xmllint --format`
///
/// A non-zero exit leaves the file as it was and is only logged; failing to
/// start `xmllint` at all is an error.
pub fn xmllint(path: &Path) -> Result<()> {
    let status = Command::new("xmllint")
        .arg("--format")
        .arg("--output")
        .arg(path)
        .arg(path)
        .status()
        .map_err(|e| MusdexError::file_access("xmllint", e))?;
    if !status.success() {
        warn!("xmllint could not format {} ({})", path.display(), status);
    }
    Ok(())
}

/// Strip every carriage return from a file
pub fn remove_crs(path: &Path) -> Result<()> {
    let content = fs::read(path).map_err(|e| MusdexError::file_access(path, e))?;
    if !content.contains(&b'\r') {
        return Ok(());
    }
    let stripped: Vec<u8> = content.into_iter().filter(|&b| b != b'\r').collect();
    utils::atomic_write(path, &stripped)
}

/// Compiled `post_extract` rules
#[derive(Clone, Default)]
pub struct PostExtract {
    rules: Vec<(Regex, String, Formatter)>,
}

impl std::fmt::Debug for PostExtract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|(regex, name, _)| (regex.as_str(), name)))
            .finish()
    }
}

impl PostExtract {
    /// Compile rules and resolve their formatters
    ///
    /// Patterns match from the start of the path, like a prefix match with
    /// regular-expression syntax.
    pub fn compile(rules: &[PostExtractRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                let regex = Regex::new(&format!("^(?:{})", rule.pattern()))?;
                let formatter = resolve_formatter(rule.formatter())?;
                Ok((regex, rule.formatter().to_string(), formatter))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(PostExtract { rules })
    }

    /// Whether no rules are configured
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every matching formatter on `path` (relative to `root`)
    ///
    /// Returns how many formatters ran.
    pub fn apply(&self, root: &Path, path: &Path) -> Result<usize> {
        let name = utils::slash_path(path);
        let mut applied = 0;
        for (regex, formatter_name, formatter) in &self.rules {
            if regex.is_match(&name) {
                debug!("Formatting {} with {}", name, formatter_name);
                formatter(&root.join(path))?;
                applied += 1;
            }
        }
        Ok(applied)
    }
}
