//! Engine version descriptor.
//!
//! Versions are kept as normalized strings because every consumer splices
//! them into file names and URLs; only the layout rules need the numeric
//! major.

use anyhow::{Context, Result, bail};
use std::fmt;
use std::str::FromStr;

/// A normalized engine version such as `4.2.1-rc1`.
///
/// `minor` and `patch` may be empty, and a `patch` of `"0"` means the
/// release has no patch segment. An empty `label` is a stable release.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SemanticVersion {
    pub major: String,
    pub minor: String,
    pub patch: String,
    pub label: String,
}

impl SemanticVersion {
    pub fn new(major: &str, minor: &str, patch: &str, label: &str) -> Self {
        Self {
            major: major.to_string(),
            minor: minor.to_string(),
            patch: patch.to_string(),
            label: label.to_string(),
        }
    }

    /// The label without separating dots (`rc.1` -> `rc1`).
    pub fn label_no_dots(&self) -> String {
        self.label.replace('.', "")
    }

    pub fn is_stable(&self) -> bool {
        self.label.is_empty()
    }

    /// Whether the version carries a patch segment in names.
    pub fn has_patch(&self) -> bool {
        !self.patch.is_empty() && self.patch != "0"
    }

    /// Numeric major version, `0` when it does not parse.
    pub fn major_number(&self) -> u32 {
        self.major.parse().unwrap_or(0)
    }

    /// `major[.minor][.patch]`, the numeric part shared by every name.
    pub fn number(&self) -> String {
        let mut number = self.major.clone();
        if !self.minor.is_empty() {
            number.push('.');
            number.push_str(&self.minor);
        }
        if self.has_patch() {
            number.push('.');
            number.push_str(&self.patch);
        }
        number
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = if self.is_stable() { "stable" } else { &self.label };
        write!(f, "{}-{}", self.number(), label)
    }
}

fn numeric_segment(value: &str, name: &str, input: &str) -> Result<String> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        bail!("Invalid {} version segment {:?} in {:?}", name, value, input);
    }
    // Normalize "02" to "2" so folder names match the vendor's
    let number: u64 = value
        .parse()
        .with_context(|| format!("Version segment {:?} is out of range", value))?;
    Ok(number.to_string())
}

impl FromStr for SemanticVersion {
    type Err = anyhow::Error;

    /// Parse `4`, `4.2`, `v4.2.1`, `4.2-stable`, `4.3-rc.2`.
    fn from_str(s: &str) -> Result<Self> {
        let input = s.trim();
        let trimmed = input.strip_prefix('v').unwrap_or(input);
        if trimmed.is_empty() {
            bail!("Version string is empty");
        }

        let (numbers, label) = match trimmed.split_once('-') {
            Some((numbers, label)) => (numbers, label),
            None => (trimmed, ""),
        };

        if label.contains('-') || label.contains('/') {
            bail!("Invalid version label {:?} in {:?}", label, input);
        }
        let label = if label.eq_ignore_ascii_case("stable") {
            ""
        } else {
            label
        };

        let mut segments = numbers.split('.');
        let major = numeric_segment(segments.next().unwrap_or(""), "major", input)?;
        let minor = match segments.next() {
            Some(minor) => numeric_segment(minor, "minor", input)?,
            None => String::new(),
        };
        let patch = match segments.next() {
            Some(patch) => numeric_segment(patch, "patch", input)?,
            None => String::new(),
        };
        if segments.next().is_some() {
            bail!("Too many version segments in {:?}", input);
        }

        Ok(Self {
            major,
            minor,
            patch,
            label: label.to_string(),
        })
    }
}
