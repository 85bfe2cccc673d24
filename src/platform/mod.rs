//! Platform variants.
//!
//! The engine's release artifacts follow a different naming scheme and a
//! different archive layout on every operating system. Each supported OS
//! is one variant of the closed [`Platform`] enum; the variant owns the
//! constants for its OS and answers the [`PlatformSpec`] capabilities the
//! environment delegates to.

mod linux;
mod macos;
mod windows;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::debug;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::runtime::{Runtime, absolutize, normalize_path};
use crate::version::SemanticVersion;

pub use linux::Linux;
pub use macos::MacOs;
pub use windows::Windows;

/// Prefix shared by every engine artifact name.
pub const GODOT_FILENAME_PREFIX: &str = "Godot_v";

/// Folder holding export templates under the OS-specific data directory.
pub const EXPORT_TEMPLATES_DIR: &str = "export_templates";

/// Managed-runtime API assemblies, relative to the managed install root.
const DOTNET_API_DEBUG_DIR: &str = "GodotSharp/Api/Debug";
const DOTNET_API_RELEASE_DIR: &str = "GodotSharp/Api/Release";

/// Artifact name without any platform suffix: `Godot_v4.2.1-rc1`,
/// `Godot_v4.2-stable`.
pub fn artifact_stem(version: &SemanticVersion) -> String {
    let label = if version.is_stable() {
        "stable".to_string()
    } else {
        version.label_no_dots()
    };
    format!("{}{}-{}", GODOT_FILENAME_PREFIX, version.number(), label)
}

/// CPU architecture, used where the vendor ships per-arch builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Arch {
    #[default]
    X86_64,
    X86,
    Arm64,
}

impl Arch {
    /// Architecture of the running binary. Unknown targets fall back to
    /// x86_64, the only architecture every release is built for.
    pub fn detect() -> Self {
        std::env::consts::ARCH.parse().unwrap_or_else(|_| {
            debug!(
                "Unknown architecture {}, assuming x86_64",
                std::env::consts::ARCH
            );
            Arch::X86_64
        })
    }
}

impl FromStr for Arch {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "x86_64" | "amd64" | "x64" => Ok(Arch::X86_64),
            "x86" | "i686" | "i386" => Ok(Arch::X86),
            "aarch64" | "arm64" => Ok(Arch::Arm64),
            other => bail!("Unsupported architecture: {}", other),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Arch::X86_64 => "x86_64",
            Arch::X86 => "x86",
            Arch::Arm64 => "arm64",
        };
        f.write_str(name)
    }
}

/// Capabilities every platform variant supplies to the environment.
#[async_trait]
pub trait PlatformSpec: Send + Sync + fmt::Display {
    /// Suffix appended to the artifact stem for the engine download,
    /// e.g. `_win64.exe` or `_mono_linux_x86_64`.
    fn installer_suffix(&self, version: &SemanticVersion, is_dotnet: bool) -> String;

    /// Absolute directory the engine reads export templates from.
    fn export_templates_base_path(&self) -> PathBuf;

    /// Engine executable, relative to the extracted archive root.
    fn executable_path(&self, version: &SemanticVersion, is_dotnet: bool) -> PathBuf;

    /// Managed-runtime debug assemblies, relative to the extracted archive
    /// root. `None` for standard builds.
    fn dotnet_debug_path(&self, version: &SemanticVersion, is_dotnet: bool) -> Option<PathBuf>;

    /// Managed-runtime release assemblies, relative to the extracted
    /// archive root. `None` for standard builds.
    fn dotnet_release_path(&self, version: &SemanticVersion, is_dotnet: bool)
    -> Option<PathBuf>;

    /// Whether `path` is something this OS can run. May read the file.
    async fn is_executable<R: Runtime>(&self, runtime: &R, path: &Path) -> bool;
}

/// One of the three supported operating systems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    Windows(Windows),
    MacOs(MacOs),
    Linux(Linux),
}

impl Platform {
    /// Build the variant for an OS name as reported by `std::env::consts::OS`.
    ///
    /// Any OS outside the supported set is a configuration error: there is
    /// no artifact to download for it. `data_dir` must be absolute, since
    /// every templates path is derived from it.
    pub fn for_os(os: &str, arch: Arch, data_dir: PathBuf) -> Result<Self> {
        if !data_dir.is_absolute() {
            bail!(
                "Data directory must be an absolute path: {}",
                data_dir.display()
            );
        }
        let data_dir = normalize_path(&data_dir);
        match os.to_lowercase().as_str() {
            "windows" => Ok(Platform::Windows(Windows::new(arch, data_dir))),
            "macos" | "darwin" | "osx" => Ok(Platform::MacOs(MacOs::new(arch, data_dir))),
            "linux" => Ok(Platform::Linux(Linux::new(arch, data_dir))),
            other => bail!("Unsupported operating system: {}", other),
        }
    }

    /// Select the variant for the running OS.
    pub fn detect<R: Runtime>(runtime: &R) -> Result<Self> {
        Self::resolve(runtime, None, None)
    }

    /// Select a variant, optionally overriding the OS name and the user
    /// data directory. A relative data directory is resolved against the
    /// current directory.
    #[tracing::instrument(skip(runtime))]
    pub fn resolve<R: Runtime>(
        runtime: &R,
        os: Option<&str>,
        data_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let os = os.unwrap_or(std::env::consts::OS);
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => runtime
                .data_dir()
                .context("Could not find the user data directory")?,
        };
        let data_dir = if data_dir.is_absolute() {
            data_dir
        } else {
            absolutize(&runtime.current_dir()?, &data_dir)
        };
        let platform = Self::for_os(os, Arch::detect(), data_dir)?;
        debug!("Selected platform: {}", platform);
        Ok(platform)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Windows(p) => fmt::Display::fmt(p, f),
            Platform::MacOs(p) => fmt::Display::fmt(p, f),
            Platform::Linux(p) => fmt::Display::fmt(p, f),
        }
    }
}

#[async_trait]
impl PlatformSpec for Platform {
    fn installer_suffix(&self, version: &SemanticVersion, is_dotnet: bool) -> String {
        match self {
            Platform::Windows(p) => p.installer_suffix(version, is_dotnet),
            Platform::MacOs(p) => p.installer_suffix(version, is_dotnet),
            Platform::Linux(p) => p.installer_suffix(version, is_dotnet),
        }
    }

    fn export_templates_base_path(&self) -> PathBuf {
        match self {
            Platform::Windows(p) => p.export_templates_base_path(),
            Platform::MacOs(p) => p.export_templates_base_path(),
            Platform::Linux(p) => p.export_templates_base_path(),
        }
    }

    fn executable_path(&self, version: &SemanticVersion, is_dotnet: bool) -> PathBuf {
        match self {
            Platform::Windows(p) => p.executable_path(version, is_dotnet),
            Platform::MacOs(p) => p.executable_path(version, is_dotnet),
            Platform::Linux(p) => p.executable_path(version, is_dotnet),
        }
    }

    fn dotnet_debug_path(&self, version: &SemanticVersion, is_dotnet: bool) -> Option<PathBuf> {
        match self {
            Platform::Windows(p) => p.dotnet_debug_path(version, is_dotnet),
            Platform::MacOs(p) => p.dotnet_debug_path(version, is_dotnet),
            Platform::Linux(p) => p.dotnet_debug_path(version, is_dotnet),
        }
    }

    fn dotnet_release_path(
        &self,
        version: &SemanticVersion,
        is_dotnet: bool,
    ) -> Option<PathBuf> {
        match self {
            Platform::Windows(p) => p.dotnet_release_path(version, is_dotnet),
            Platform::MacOs(p) => p.dotnet_release_path(version, is_dotnet),
            Platform::Linux(p) => p.dotnet_release_path(version, is_dotnet),
        }
    }

    async fn is_executable<R: Runtime>(&self, runtime: &R, path: &Path) -> bool {
        match self {
            Platform::Windows(p) => p.is_executable(runtime, path).await,
            Platform::MacOs(p) => p.is_executable(runtime, path).await,
            Platform::Linux(p) => p.is_executable(runtime, path).await,
        }
    }
}

/// `dir/GodotSharp/Api/{Debug,Release}` for managed builds.
fn dotnet_api_path(root: Option<PathBuf>, release: bool) -> Option<PathBuf> {
    let dir = if release {
        DOTNET_API_RELEASE_DIR
    } else {
        DOTNET_API_DEBUG_DIR
    };
    root.map(|root| root.join(dir))
}

/// Any of the Unix execute bits set.
fn has_execute_bit<R: Runtime>(runtime: &R, path: &Path) -> bool {
    match runtime.file_mode(path) {
        Ok(Some(mode)) => mode & 0o111 != 0,
        Ok(None) => false,
        Err(e) => {
            debug!("Could not read permissions of {:?}: {}", path, e);
            false
        }
    }
}
