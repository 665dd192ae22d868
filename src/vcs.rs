//! Version-control adapter
//!
//! musdex never talks to a version-control system directly. It lists the
//! tracked files, and adds or removes single files, through the [`Vcs`]
//! trait. [`CommandVcs`] implements it by running the shell command
//! templates from the configuration, with the file path appended as the
//! last argument.

use crate::error::{MusdexError, Result};
use crate::utils;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, trace};

/// Default command adding a file to version control
pub const DEFAULT_ADD: &str = "darcs add";

/// Default command removing a file from version control
pub const DEFAULT_REMOVE: &str = "darcs remove";

/// Default command listing tracked files
pub const DEFAULT_SHOW_FILES: &str = "darcs show files --no-directories";

/// Operations musdex needs from a version-control system
///
/// All paths are relative to the working tree root.
pub trait Vcs {
    /// List every tracked file
    fn tracked_files(&self) -> Result<Vec<PathBuf>>;

    /// Start tracking a file or directory
    fn add_file(&self, path: &Path) -> Result<()>;

    /// Stop tracking a file
    fn remove_file(&self, path: &Path) -> Result<()>;
}

/// Shell command templates for the three VCS operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsCommands {
    /// Adds the path given as the final argument
    pub add: String,
    /// Removes the path given as the final argument
    pub remove: String,
    /// Prints one tracked path per line
    pub show_files: String,
}

impl Default for VcsCommands {
    fn default() -> Self {
        VcsCommands {
            add: DEFAULT_ADD.to_string(),
            remove: DEFAULT_REMOVE.to_string(),
            show_files: DEFAULT_SHOW_FILES.to_string(),
        }
    }
}

/// [`Vcs`] implementation running external commands in the working tree
#[derive(Debug, Clone)]
pub struct CommandVcs {
    root: PathBuf,
    commands: VcsCommands,
}

impl CommandVcs {
    /// Create an adapter running `commands` with `root` as working directory
    pub fn new(root: impl Into<PathBuf>, commands: VcsCommands) -> Self {
        CommandVcs {
            root: root.into(),
            commands,
        }
    }

    /// Configured command templates
    pub fn commands(&self) -> &VcsCommands {
        &self.commands
    }

    fn run(&self, kind: &'static str, template: &str, path: Option<&Path>) -> Result<Output> {
        let mut words = template.split_whitespace();
        let program = words.next().ok_or(MusdexError::VcsCommandEmpty(kind))?;

        let mut command = Command::new(program);
        command.args(words).current_dir(&self.root);
        let mut command_line = template.trim().to_string();
        if let Some(path) = path {
            command.arg(path);
            command_line.push(' ');
            command_line.push_str(&path.to_string_lossy());
        }

        debug!("Running VCS command: {}", command_line);
        let output = command.output().map_err(|e| MusdexError::VcsCommandFailed {
            command: command_line.clone(),
            code: None,
            stderr: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(MusdexError::VcsCommandFailed {
                command: command_line,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(output)
    }
}

impl Vcs for CommandVcs {
    fn tracked_files(&self) -> Result<Vec<PathBuf>> {
        let output = self.run("vcs_show_files", &self.commands.show_files, None)?;
        let files: Vec<PathBuf> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| utils::normalize_relative(Path::new(line)))
            .filter(|path| !path.as_os_str().is_empty())
            .collect();
        trace!("VCS tracks {} files", files.len());
        Ok(files)
    }

    fn add_file(&self, path: &Path) -> Result<()> {
        self.run("vcs_add", &self.commands.add, Some(path))?;
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.run("vcs_remove", &self.commands.remove, Some(path))?;
        Ok(())
    }
}
