//! Recursive search for runnable engine binaries in an extracted archive.

use anyhow::Result;
use futures_util::future::BoxFuture;
use futures_util::{FutureExt, StreamExt, stream};
use log::{debug, info};
use serde::Serialize;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

use super::Environment;
use crate::platform::PlatformSpec;
use crate::runtime::{EntryKind, Runtime};

/// Managed-runtime libraries reported as executable regardless of what the
/// platform's probe says about them.
pub const DOTNET_SUPPORT_LIBRARIES: &[&str] = &["GodotSharp.dll"];

/// macOS localization bundles (`fr.lproj`).
const LOCALIZATION_BUNDLE_EXTENSION: &str = ".lproj";

/// Upper bound on files of one directory probed at the same time. Probes
/// may open the file, so this also bounds open descriptors.
pub(crate) const MAX_CONCURRENT_PROBES: usize = 16;

/// A file the scan confirmed as executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutableFile {
    pub path: PathBuf,
    pub name: String,
}

impl ExecutableFile {
    fn new(path: PathBuf) -> Self {
        let name = file_name(&path).into_owned();
        Self { path, name }
    }
}

/// Receives progress of a scan. Both hooks default to doing nothing.
pub trait ScanObserver: Send + Sync {
    fn directory_entered(&self, _dir: &Path) {}
    fn executable_found(&self, _file: &ExecutableFile) {}
}

impl ScanObserver for () {}

/// Narrates the scan through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl ScanObserver for LogObserver {
    fn directory_entered(&self, dir: &Path) {
        info!("Searching {}", dir.display());
    }

    fn executable_found(&self, file: &ExecutableFile) {
        info!("Found executable {}", file.path.display());
    }
}

fn file_name(path: &Path) -> Cow<'_, str> {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default()
}

fn is_pruned(path: &Path) -> bool {
    let name = file_name(path).to_lowercase();
    name.contains("debug") || name.ends_with(LOCALIZATION_BUNDLE_EXTENSION)
}

/// Whether a scan enters `dir`. Debug builds and localization bundles are
/// never reported, so their whole subtree is skipped.
pub fn should_descend(dir: &Path) -> bool {
    !is_pruned(dir)
}

/// Only files are probed. A link counts as a file when its target is one
/// and its own name would not be pruned as a directory.
fn should_probe(path: &Path, kind: EntryKind) -> bool {
    match kind {
        EntryKind::File => true,
        EntryKind::Symlink { to_dir: false } => !is_pruned(path),
        EntryKind::Dir | EntryKind::Symlink { to_dir: true } => false,
    }
}

fn is_dotnet_support_library(name: &str) -> bool {
    DOTNET_SUPPORT_LIBRARIES
        .iter()
        .any(|library| name.eq_ignore_ascii_case(library))
}

impl<R: Runtime> Environment<R> {
    /// Depth-first search of `root` for files the platform can run.
    ///
    /// Entries are visited in name order, so the result is stable across
    /// runs. Files of one directory are probed concurrently, at most
    /// [`MAX_CONCURRENT_PROBES`] at a time. Symlinked directories are never
    /// followed. Any unreadable directory fails the whole scan.
    #[tracing::instrument(skip(self, observer))]
    pub async fn find_executables_recursively(
        &self,
        root: &Path,
        observer: &dyn ScanObserver,
    ) -> Result<Vec<ExecutableFile>> {
        let mut found = Vec::new();
        self.scan_dir(root, observer, &mut found).await?;
        debug!("Found {} executables under {:?}", found.len(), root);
        Ok(found)
    }

    fn scan_dir<'a>(
        &'a self,
        dir: &'a Path,
        observer: &'a dyn ScanObserver,
        found: &'a mut Vec<ExecutableFile>,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            observer.directory_entered(dir);

            let mut entries = Vec::new();
            for path in self.runtime.read_dir(dir)? {
                let kind = self.runtime.entry_kind(&path)?;
                entries.push((path, kind));
            }
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));

            let probes: Vec<_> = entries
                .iter()
                .map(|(path, kind)| async move {
                    should_probe(path, *kind) && self.is_executable_file(path).await
                })
                .collect();
            let verdicts: Vec<bool> = stream::iter(probes)
                .buffered(MAX_CONCURRENT_PROBES)
                .collect()
                .await;

            for ((path, kind), executable) in entries.into_iter().zip(verdicts) {
                match kind {
                    EntryKind::Dir if should_descend(&path) => {
                        self.scan_dir(&path, observer, found).await?;
                    }
                    EntryKind::Dir | EntryKind::Symlink { to_dir: true } => {
                        debug!("Skipping {:?}", path);
                    }
                    _ if executable => {
                        let file = ExecutableFile::new(path);
                        observer.executable_found(&file);
                        found.push(file);
                    }
                    _ => {}
                }
            }
            Ok(())
        }
        .boxed()
    }

    async fn is_executable_file(&self, path: &Path) -> bool {
        if is_dotnet_support_library(&file_name(path)) {
            return true;
        }
        self.platform.is_executable(&self.runtime, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Arch, Platform};
    use crate::runtime::{MockRuntime, RealRuntime};
    use std::fs;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ScanObserver for Recorder {
        fn directory_entered(&self, dir: &Path) {
            self.events
                .lock()
                .unwrap()
                .push(format!("dir {}", file_name(dir)));
        }

        fn executable_found(&self, file: &ExecutableFile) {
            self.events
                .lock()
                .unwrap()
                .push(format!("exe {}", file.name));
        }
    }

    fn windows_env<R: Runtime>(runtime: R) -> Environment<R> {
        let platform = Platform::for_os("windows", Arch::X86_64, std::env::temp_dir()).unwrap();
        Environment::new(platform, runtime)
    }

    fn linux_env<R: Runtime>(runtime: R) -> Environment<R> {
        let platform = Platform::for_os("linux", Arch::X86_64, std::env::temp_dir()).unwrap();
        Environment::new(platform, runtime)
    }

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"payload").unwrap();
    }

    #[test]
    fn test_should_descend() {
        assert!(should_descend(Path::new("bin")));
        assert!(should_descend(Path::new("GodotSharp")));
        assert!(!should_descend(Path::new("bin/Debug")));
        assert!(!should_descend(Path::new("bin/DEBUG")));
        assert!(!should_descend(Path::new("bin/editor_debug_symbols")));
        assert!(!should_descend(Path::new("Resources/fr.lproj")));
        assert!(!should_descend(Path::new("Resources/EN.LPROJ")));
        assert!(should_descend(Path::new("Resources/lproj")));
    }

    #[tokio::test]
    async fn test_scan_skips_debug_and_localization() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "bin/Godot.exe");
        touch(dir.path(), "bin/Debug/GodotDebug.exe");
        touch(dir.path(), "bin/fr.lproj/res");

        let env = windows_env(RealRuntime);
        let found = env
            .find_executables_recursively(dir.path(), &())
            .await
            .unwrap();

        assert_eq!(
            found,
            vec![ExecutableFile {
                path: dir.path().join("bin").join("Godot.exe"),
                name: "Godot.exe".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_scan_support_library_always_executable_but_pruned() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "GodotSharp/Api/Release/GodotSharp.dll");
        touch(dir.path(), "GodotSharp/Api/Debug/GodotSharp.dll");
        touch(dir.path(), "GodotSharp/Api/Release/GodotSharp.xml");

        let env = windows_env(RealRuntime);
        let found = env
            .find_executables_recursively(dir.path(), &())
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].path,
            dir.path().join("GodotSharp/Api/Release/GodotSharp.dll")
        );
    }

    #[tokio::test]
    async fn test_scan_order_is_depth_first_by_name() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "b.exe");
        touch(dir.path(), "a/z.exe");
        touch(dir.path(), "a/nested/y.exe");
        touch(dir.path(), "c.exe");
        touch(dir.path(), "notes.txt");

        let recorder = Recorder::default();
        let env = windows_env(RealRuntime);
        let found = env
            .find_executables_recursively(dir.path(), &recorder)
            .await
            .unwrap();

        let names: Vec<_> = found.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["y.exe", "z.exe", "b.exe", "c.exe"]);

        let events = recorder.events.into_inner().unwrap();
        assert_eq!(
            &events[1..],
            [
                "dir a",
                "dir nested",
                "exe y.exe",
                "exe z.exe",
                "exe b.exe",
                "exe c.exe"
            ]
        );
    }

    #[tokio::test]
    async fn test_scan_empty_tree() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("empty/deeper")).unwrap();

        let env = windows_env(RealRuntime);
        let found = env
            .find_executables_recursively(dir.path(), &LogObserver)
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_scan_missing_root_fails() {
        let dir = tempdir().unwrap();
        let env = windows_env(RealRuntime);
        let result = env
            .find_executables_recursively(&dir.path().join("missing"), &())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_scan_nested_read_failure_fails_whole_scan() {
        let mut runtime = MockRuntime::new();
        let root = PathBuf::from("/install");

        runtime
            .expect_read_dir()
            .withf(|p| p == Path::new("/install"))
            .returning(|p| Ok(vec![p.join("Godot.exe"), p.join("locked")]));
        runtime
            .expect_read_dir()
            .withf(|p| p == Path::new("/install/locked"))
            .returning(|_| Err(anyhow::anyhow!("permission denied")));
        runtime.expect_entry_kind().returning(|p| {
            Ok(if p.ends_with("locked") {
                EntryKind::Dir
            } else {
                EntryKind::File
            })
        });

        let env = windows_env(runtime);
        let err = env
            .find_executables_recursively(&root, &())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("permission denied"));
    }

    #[test_log::test(tokio::test)]
    async fn test_scan_never_reads_pruned_directories() {
        let mut runtime = MockRuntime::new();

        // Only the root is listed; reading Debug or fr.lproj would panic the mock
        runtime
            .expect_read_dir()
            .withf(|p| p == Path::new("/install"))
            .times(1)
            .returning(|p| {
                Ok(vec![
                    p.join("Debug"),
                    p.join("fr.lproj"),
                    p.join("Godot.exe"),
                ])
            });
        runtime.expect_entry_kind().returning(|p| {
            Ok(if p.ends_with("Godot.exe") {
                EntryKind::File
            } else {
                EntryKind::Dir
            })
        });

        let env = windows_env(runtime);
        let found = env
            .find_executables_recursively(Path::new("/install"), &LogObserver)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Godot.exe");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scan_linux_uses_execute_bit() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        touch(dir.path(), "Godot_v4.2-stable_linux.x86_64");
        touch(dir.path(), "README.txt");
        touch(dir.path(), "GodotSharp/Api/Release/GodotSharp.dll");
        fs::set_permissions(
            dir.path().join("Godot_v4.2-stable_linux.x86_64"),
            fs::Permissions::from_mode(0o755),
        )
        .unwrap();

        let env = linux_env(RealRuntime);
        let found = env
            .find_executables_recursively(dir.path(), &())
            .await
            .unwrap();

        let names: Vec<_> = found.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["GodotSharp.dll", "Godot_v4.2-stable_linux.x86_64"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scan_never_reports_symlinked_directories() {
        use std::os::unix::fs::{PermissionsExt, symlink};

        let dir = tempdir().unwrap();
        touch(dir.path(), "real/Debug/GodotSharp.dll");
        touch(dir.path(), "real/Godot_bin");
        fs::set_permissions(
            dir.path().join("real/Godot_bin"),
            fs::Permissions::from_mode(0o755),
        )
        .unwrap();
        symlink(dir.path().join("real/Debug"), dir.path().join("Debug")).unwrap();
        symlink(dir.path().join("real"), dir.path().join("Versions")).unwrap();
        symlink(dir.path().join("real/Godot_bin"), dir.path().join("Godot")).unwrap();
        symlink(dir.path().join("real/Godot_bin"), dir.path().join("debug_tool")).unwrap();

        let env = linux_env(RealRuntime);
        let found = env
            .find_executables_recursively(dir.path(), &())
            .await
            .unwrap();

        let names: Vec<_> = found.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Godot", "Godot_bin"]);
    }

    #[tokio::test]
    async fn test_scan_skips_linked_directories_without_probing() {
        let mut runtime = MockRuntime::new();

        // Neither link is listed nor has its permissions read
        runtime
            .expect_read_dir()
            .withf(|p| p == Path::new("/install"))
            .times(1)
            .returning(|p| Ok(vec![p.join("Debug"), p.join("Versions")]));
        runtime
            .expect_entry_kind()
            .returning(|_| Ok(EntryKind::Symlink { to_dir: true }));
        runtime.expect_file_mode().never();

        let env = linux_env(runtime);
        let found = env
            .find_executables_recursively(Path::new("/install"), &())
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_are_still_matched() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let debug_dir = Path::new("bin").join(OsStr::from_bytes(b"Debug\xff"));
        assert!(!should_descend(&debug_dir));

        let bundle = Path::new("Resources").join(OsStr::from_bytes(b"\xfe.lproj"));
        assert!(!should_descend(&bundle));

        let plain = Path::new("bin").join(OsStr::from_bytes(b"tools\xff"));
        assert!(should_descend(&plain));
    }

    /// Counts how many header reads are in progress at once.
    #[derive(Default)]
    struct CountingRuntime {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Runtime for CountingRuntime {
        fn data_dir(&self) -> Option<PathBuf> {
            None
        }

        fn current_dir(&self) -> Result<PathBuf> {
            Ok(std::env::temp_dir())
        }

        fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
            Ok((0..64)
                .map(|i| path.join(format!("lib{:02}.dylib", i)))
                .collect())
        }

        fn entry_kind(&self, _path: &Path) -> Result<EntryKind> {
            Ok(EntryKind::File)
        }

        fn file_mode(&self, _path: &Path) -> Result<Option<u32>> {
            Ok(Some(0o644))
        }

        async fn read_prefix(&self, path: &Path, _len: usize) -> Result<Vec<u8>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            // Even-numbered files are Mach-O images
            let even = file_name(path)
                .trim_end_matches(".dylib")
                .ends_with(['0', '2', '4', '6', '8']);
            if even {
                let mut head = vec![0xcf, 0xfa, 0xed, 0xfe, 0x0c, 0x00, 0x00, 0x01];
                head.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00]);
                Ok(head)
            } else {
                Ok(b"not an image....".to_vec())
            }
        }
    }

    #[tokio::test]
    async fn test_scan_bounds_concurrent_probes() {
        let platform = Platform::for_os("macos", Arch::Arm64, std::env::temp_dir()).unwrap();
        let env = Environment::new(platform, CountingRuntime::default());

        let found = env
            .find_executables_recursively(Path::new("/Frameworks"), &())
            .await
            .unwrap();

        let expected: Vec<String> = (0..64)
            .step_by(2)
            .map(|i| format!("lib{:02}.dylib", i))
            .collect();
        let names: Vec<_> = found.iter().map(|f| f.name.clone()).collect();
        assert_eq!(names, expected);

        let peak = env.runtime.peak.load(Ordering::SeqCst);
        assert!(peak > 1, "probes ran one at a time");
        assert!(peak <= MAX_CONCURRENT_PROBES, "peak of {} probes", peak);
    }
}
