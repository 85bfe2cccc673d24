use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

use super::{Arch, EXPORT_TEMPLATES_DIR, PlatformSpec, artifact_stem, dotnet_api_path};
use crate::runtime::Runtime;
use crate::version::SemanticVersion;

/// Extensions Windows will launch directly.
const EXECUTABLE_EXTENSIONS: &[&str] = &["exe", "com"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Windows {
    arch: Arch,
    data_dir: PathBuf,
}

impl Windows {
    /// `data_dir` is the roaming application data directory (`%APPDATA%`).
    pub(crate) fn new(arch: Arch, data_dir: PathBuf) -> Self {
        Self { arch, data_dir }
    }

    fn arch_tag(&self) -> &'static str {
        match self.arch {
            Arch::X86_64 => "win64",
            Arch::X86 => "win32",
            Arch::Arm64 => "windows_arm64",
        }
    }

    /// Folder the managed build's archive unpacks into.
    fn dotnet_root(&self, version: &SemanticVersion) -> PathBuf {
        PathBuf::from(format!("{}_mono_{}", artifact_stem(version), self.arch_tag()))
    }
}

impl fmt::Display for Windows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Windows ({})", self.arch)
    }
}

#[async_trait]
impl PlatformSpec for Windows {
    fn installer_suffix(&self, _version: &SemanticVersion, is_dotnet: bool) -> String {
        if is_dotnet {
            format!("_mono_{}", self.arch_tag())
        } else {
            format!("_{}.exe", self.arch_tag())
        }
    }

    fn export_templates_base_path(&self) -> PathBuf {
        self.data_dir.join("Godot").join(EXPORT_TEMPLATES_DIR)
    }

    fn executable_path(&self, version: &SemanticVersion, is_dotnet: bool) -> PathBuf {
        let stem = artifact_stem(version);
        if is_dotnet {
            self.dotnet_root(version)
                .join(format!("{}_mono_{}.exe", stem, self.arch_tag()))
        } else {
            PathBuf::from(format!("{}_{}.exe", stem, self.arch_tag()))
        }
    }

    fn dotnet_debug_path(&self, version: &SemanticVersion, is_dotnet: bool) -> Option<PathBuf> {
        dotnet_api_path(is_dotnet.then(|| self.dotnet_root(version)), false)
    }

    fn dotnet_release_path(
        &self,
        version: &SemanticVersion,
        is_dotnet: bool,
    ) -> Option<PathBuf> {
        dotnet_api_path(is_dotnet.then(|| self.dotnet_root(version)), true)
    }

    /// Windows has no execute bit; the extension decides.
    async fn is_executable<R: Runtime>(&self, _runtime: &R, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                EXECUTABLE_EXTENSIONS
                    .iter()
                    .any(|allowed| ext.eq_ignore_ascii_case(allowed))
            })
            .unwrap_or(false)
    }
}
