//! Download URLs, local paths and executable discovery for an engine
//! version on the selected platform.
//!
//! Names produced here must match the vendor's published artifacts byte for
//! byte: `Godot_v4.2-stable_win64.exe.zip`, not `Godot_v4.2_win64.exe.zip`.

mod scan;

use std::path::{Path, PathBuf};

use crate::platform::{Platform, PlatformSpec, artifact_stem};
use crate::runtime::{Runtime, normalize_path};
use crate::version::SemanticVersion;

pub use scan::{
    DOTNET_SUPPORT_LIBRARIES, ExecutableFile, LogObserver, ScanObserver, should_descend,
};

/// Root of the vendor's release mirror.
pub const GODOT_URL_PREFIX: &str = "https://downloads.tuxfamily.org/godotengine/";

const ENGINE_ARCHIVE_EXTENSION: &str = ".zip";
const EXPORT_TEMPLATES_SUFFIX: &str = "_export_templates.tpz";

pub struct Environment<R: Runtime> {
    platform: Platform,
    runtime: R,
    download_prefix: String,
}

impl<R: Runtime> Environment<R> {
    pub fn new(platform: Platform, runtime: R) -> Self {
        Self {
            platform,
            runtime,
            download_prefix: GODOT_URL_PREFIX.to_string(),
        }
    }

    /// Download from a mirror with the same layout instead of the vendor.
    pub fn with_download_prefix(mut self, prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        self.download_prefix = prefix;
        self
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn download_prefix(&self) -> &str {
        &self.download_prefix
    }

    /// Where the engine looks for the export templates of `version`, e.g.
    /// `~/.local/share/godot/export_templates/4.2.1.rc1.mono`.
    pub fn export_templates_local_path(
        &self,
        version: &SemanticVersion,
        is_dotnet: bool,
    ) -> PathBuf {
        let mut folder = version.number();
        folder.push('.');
        if version.is_stable() {
            folder.push_str("stable");
        } else {
            folder.push_str(&version.label);
        }
        if is_dotnet {
            folder.push_str(".mono");
        }
        normalize_path(&self.platform.export_templates_base_path().join(folder))
    }

    /// Remote location of the engine archive or of the export templates.
    ///
    /// `{prefix}4.2.1/rc1/mono/Godot_v4.2.1-rc1_mono_win64.zip`
    pub fn download_url(
        &self,
        version: &SemanticVersion,
        is_dotnet: bool,
        is_template: bool,
    ) -> String {
        let mut url = format!("{}{}/", self.download_prefix, version.number());
        if !version.is_stable() {
            url.push_str(&version.label_no_dots());
            url.push('/');
        }
        if is_dotnet {
            url.push_str("mono/");
        }
        url.push_str(&self.artifact_filename(version, is_dotnet, is_template));
        url
    }

    /// File name of the engine archive or of the export templates.
    pub fn artifact_filename(
        &self,
        version: &SemanticVersion,
        is_dotnet: bool,
        is_template: bool,
    ) -> String {
        let stem = artifact_stem(version);
        if is_template {
            let flavor = if is_dotnet { "_mono" } else { "" };
            format!("{}{}{}", stem, flavor, EXPORT_TEMPLATES_SUFFIX)
        } else {
            format!(
                "{}{}{}",
                stem,
                self.platform.installer_suffix(version, is_dotnet),
                ENGINE_ARCHIVE_EXTENSION
            )
        }
    }

    /// Engine executable inside an extracted archive.
    pub fn executable_path(
        &self,
        install_dir: &Path,
        version: &SemanticVersion,
        is_dotnet: bool,
    ) -> PathBuf {
        install_dir.join(self.platform.executable_path(version, is_dotnet))
    }

    pub fn dotnet_debug_path(
        &self,
        install_dir: &Path,
        version: &SemanticVersion,
        is_dotnet: bool,
    ) -> Option<PathBuf> {
        self.platform
            .dotnet_debug_path(version, is_dotnet)
            .map(|relative| install_dir.join(relative))
    }

    pub fn dotnet_release_path(
        &self,
        install_dir: &Path,
        version: &SemanticVersion,
        is_dotnet: bool,
    ) -> Option<PathBuf> {
        self.platform
            .dotnet_release_path(version, is_dotnet)
            .map(|relative| install_dir.join(relative))
    }
}
