//! Read-only file system probes.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

use super::{EntryKind, RealRuntime};

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn read_dir_impl(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(path)
            .with_context(|| format!("Failed to read directory {}", path.display()))?;
        entries
            .map(|entry| {
                let entry = entry
                    .with_context(|| format!("Failed to read entry in {}", path.display()))?;
                Ok(entry.path())
            })
            .collect()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn entry_kind_impl(&self, path: &Path) -> Result<EntryKind> {
        let metadata = fs::symlink_metadata(path)
            .with_context(|| format!("Failed to read metadata of {}", path.display()))?;
        let file_type = metadata.file_type();
        if file_type.is_symlink() {
            let to_dir = fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false);
            Ok(EntryKind::Symlink { to_dir })
        } else if file_type.is_dir() {
            Ok(EntryKind::Dir)
        } else {
            Ok(EntryKind::File)
        }
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn file_mode_impl(&self, path: &Path) -> Result<Option<u32>> {
        let metadata = fs::metadata(path)
            .with_context(|| format!("Failed to read metadata of {}", path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            Ok(Some(metadata.permissions().mode()))
        }
        #[cfg(not(unix))]
        {
            let _ = metadata;
            Ok(None)
        }
    }

    #[tracing::instrument(skip(self))]
    pub(crate) async fn read_prefix_impl(&self, path: &Path, len: usize) -> Result<Vec<u8>> {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let mut buffer = Vec::with_capacity(len);
        file.take(len as u64)
            .read_to_end(&mut buffer)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(buffer)
    }
}
