use async_trait::async_trait;
use log::debug;
use std::fmt;
use std::path::{Path, PathBuf};

use super::{Arch, EXPORT_TEMPLATES_DIR, PlatformSpec, dotnet_api_path, has_execute_bit};
use crate::runtime::Runtime;
use crate::version::SemanticVersion;

const APP_BUNDLE: &str = "Godot.app";
const DOTNET_APP_BUNDLE: &str = "Godot_mono.app";

/// Releases ship one universal build, so the architecture is only
/// reported, never part of a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacOs {
    arch: Arch,
    data_dir: PathBuf,
}

impl MacOs {
    /// `data_dir` is `~/Library/Application Support`.
    pub(crate) fn new(arch: Arch, data_dir: PathBuf) -> Self {
        Self { arch, data_dir }
    }

    fn os_tag(version: &SemanticVersion) -> &'static str {
        // Renamed from "osx" with 4.0
        if version.major_number() >= 4 {
            "macos.universal"
        } else {
            "osx.universal"
        }
    }

    fn bundle(is_dotnet: bool) -> &'static str {
        if is_dotnet { DOTNET_APP_BUNDLE } else { APP_BUNDLE }
    }

    fn dotnet_root(is_dotnet: bool) -> Option<PathBuf> {
        is_dotnet.then(|| Path::new(DOTNET_APP_BUNDLE).join("Contents/Resources"))
    }
}

impl fmt::Display for MacOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "macOS ({}, universal build)", self.arch)
    }
}

#[async_trait]
impl PlatformSpec for MacOs {
    fn installer_suffix(&self, version: &SemanticVersion, is_dotnet: bool) -> String {
        if is_dotnet {
            format!("_mono_{}", Self::os_tag(version))
        } else {
            format!("_{}", Self::os_tag(version))
        }
    }

    fn export_templates_base_path(&self) -> PathBuf {
        self.data_dir.join("Godot").join(EXPORT_TEMPLATES_DIR)
    }

    fn executable_path(&self, _version: &SemanticVersion, is_dotnet: bool) -> PathBuf {
        Path::new(Self::bundle(is_dotnet)).join("Contents/MacOS/Godot")
    }

    fn dotnet_debug_path(&self, _version: &SemanticVersion, is_dotnet: bool) -> Option<PathBuf> {
        dotnet_api_path(Self::dotnet_root(is_dotnet), false)
    }

    fn dotnet_release_path(
        &self,
        _version: &SemanticVersion,
        is_dotnet: bool,
    ) -> Option<PathBuf> {
        dotnet_api_path(Self::dotnet_root(is_dotnet), true)
    }

    /// A Mach-O image (thin or universal), or anything with an execute bit.
    async fn is_executable<R: Runtime>(&self, runtime: &R, path: &Path) -> bool {
        match runtime.read_prefix(path, 16).await {
            Ok(head) => {
                if let Ok(bytes) = <[u8; 16]>::try_from(head.as_slice()) {
                    if matches!(
                        goblin::peek_bytes(&bytes),
                        Ok(goblin::Hint::Mach(_)) | Ok(goblin::Hint::MachFat(_))
                    ) {
                        return true;
                    }
                }
            }
            Err(e) => debug!("Could not read header of {:?}: {}", path, e),
        }
        has_execute_bit(runtime, path)
    }
}
