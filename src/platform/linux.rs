use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

use super::{
    Arch, EXPORT_TEMPLATES_DIR, PlatformSpec, artifact_stem, dotnet_api_path, has_execute_bit,
};
use crate::runtime::Runtime;
use crate::version::SemanticVersion;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Linux {
    arch: Arch,
    data_dir: PathBuf,
}

impl Linux {
    /// `data_dir` is `$XDG_DATA_HOME`, usually `~/.local/share`.
    pub(crate) fn new(arch: Arch, data_dir: PathBuf) -> Self {
        Self { arch, data_dir }
    }

    /// Binary suffix without the leading underscore: `linux.x86_64` for
    /// 4.x, `x11.64` for 3.x. 3.x has no arm64 build.
    fn binary_tag(&self, version: &SemanticVersion) -> &'static str {
        if version.major_number() >= 4 {
            match self.arch {
                Arch::X86_64 => "linux.x86_64",
                Arch::X86 => "linux.x86_32",
                Arch::Arm64 => "linux.arm64",
            }
        } else {
            match self.arch {
                Arch::X86 => "x11.32",
                Arch::X86_64 | Arch::Arm64 => "x11.64",
            }
        }
    }

    /// The managed archive and its folder use underscores throughout:
    /// `mono_linux_x86_64`.
    fn dotnet_tag(&self, version: &SemanticVersion) -> String {
        format!("mono_{}", self.binary_tag(version).replace('.', "_"))
    }

    fn dotnet_root(&self, version: &SemanticVersion) -> PathBuf {
        PathBuf::from(format!(
            "{}_{}",
            artifact_stem(version),
            self.dotnet_tag(version)
        ))
    }
}

impl fmt::Display for Linux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Linux ({})", self.arch)
    }
}

#[async_trait]
impl PlatformSpec for Linux {
    fn installer_suffix(&self, version: &SemanticVersion, is_dotnet: bool) -> String {
        if is_dotnet {
            format!("_{}", self.dotnet_tag(version))
        } else {
            format!("_{}", self.binary_tag(version))
        }
    }

    fn export_templates_base_path(&self) -> PathBuf {
        self.data_dir.join("godot").join(EXPORT_TEMPLATES_DIR)
    }

    fn executable_path(&self, version: &SemanticVersion, is_dotnet: bool) -> PathBuf {
        let stem = artifact_stem(version);
        if is_dotnet {
            // The binary inside keeps the dotted tag
            self.dotnet_root(version)
                .join(format!("{}_mono_{}", stem, self.binary_tag(version)))
        } else {
            PathBuf::from(format!("{}_{}", stem, self.binary_tag(version)))
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

    async fn is_executable<R: Runtime>(&self, runtime: &R, path: &Path) -> bool {
        has_execute_bit(runtime, path)
    }
}
