//! Runtime abstraction for the system operations the core depends on.
//!
//! Everything that touches the host (user directories, directory listings,
//! permission bits, file headers) goes through the [`Runtime`] trait so the
//! derivation and scan logic can be exercised against a mock.
//!
//! # Structure
//!
//! - `path` - Lexical path helpers (normalize, absolutize)
//! - `env` - User directories and the working directory
//! - `fs` - Read-only file system probes

mod env;
mod fs;
pub mod path;

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use path::{absolutize, normalize_path};

/// What a directory entry is, looked up without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    /// A symbolic link. `to_dir` is set when its target is a directory;
    /// dangling links report `false`.
    Symlink { to_dir: bool },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Runtime: Send + Sync {
    // Directories
    /// Per-user application data directory (`%APPDATA%`,
    /// `~/Library/Application Support`, `$XDG_DATA_HOME`).
    fn data_dir(&self) -> Option<PathBuf>;

    fn current_dir(&self) -> Result<PathBuf>;

    // File System
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    fn entry_kind(&self, path: &Path) -> Result<EntryKind>;

    /// Unix permission bits of a file, `None` on platforms without them.
    fn file_mode(&self, path: &Path) -> Result<Option<u32>>;

    /// Read at most `len` bytes from the start of a file.
    async fn read_prefix(&self, path: &Path, len: usize) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RealRuntime;

#[async_trait]
impl Runtime for RealRuntime {
    fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir_impl()
    }

    fn current_dir(&self) -> Result<PathBuf> {
        self.current_dir_impl()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.read_dir_impl(path)
    }

    fn entry_kind(&self, path: &Path) -> Result<EntryKind> {
        self.entry_kind_impl(path)
    }

    fn file_mode(&self, path: &Path) -> Result<Option<u32>> {
        self.file_mode_impl(path)
    }

    async fn read_prefix(&self, path: &Path, len: usize) -> Result<Vec<u8>> {
        self.read_prefix_impl(path, len).await
    }
}
