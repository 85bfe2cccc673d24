pub mod environment;
pub mod platform;
pub mod runtime;
pub mod version;

pub use environment::{Environment, ExecutableFile, LogObserver, ScanObserver};
pub use platform::{Arch, Platform, PlatformSpec};
pub use version::SemanticVersion;
