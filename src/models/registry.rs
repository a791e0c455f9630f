//! Discovery and selection of versioned model artifacts.
//!
//! A model directory holds one entry per trained model version. Entries whose
//! name starts with `model` are artifacts; the version is the first
//! `X.Y.Z` pattern in the name, optionally preceded by `v`.
//!
//! Version parsing never fails: a name without a tag is ranked as `0.0.0`.
//! As a consequence a lone artifact with a malformed name is still returned by
//! [`latest`], since it is the only candidate.

use crate::core::config::ModelSelection;
use crate::core::constants::MODEL_PREFIX;
use crate::core::errors::{ClassifyError, ClassifyResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

static VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"v?(\d+)\.(\d+)\.(\d+)").expect("version pattern is a valid regex")
});

/// A `(major, minor, patch)` version triple, ordered lexicographically.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct VersionTag {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl VersionTag {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Returns true for the `0.0.0` fallback tag.
    pub fn is_unversioned(&self) -> bool {
        *self == Self::default()
    }
}

impl std::fmt::Display for VersionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl From<(u64, u64, u64)> for VersionTag {
    fn from((major, minor, patch): (u64, u64, u64)) -> Self {
        Self::new(major, minor, patch)
    }
}

/// Parses the first `X.Y.Z` pattern found anywhere in `name`.
///
/// Returns `0.0.0` when no pattern is present or a component does not fit in
/// a `u64`.
pub fn parse_version(name: &str) -> VersionTag {
    let Some(caps) = VERSION_PATTERN.captures(name) else {
        return VersionTag::default();
    };
    let component = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    match (component(1), component(2), component(3)) {
        (Some(major), Some(minor), Some(patch)) => VersionTag::new(major, minor, patch),
        _ => VersionTag::default(),
    }
}

/// One discovered model artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// File or directory name.
    pub name: String,
    /// Absolute location.
    pub path: PathBuf,
    /// Parsed version tag, `0.0.0` when the name carries none.
    pub version: VersionTag,
}

impl ModelArtifact {
    /// Creates an artifact, parsing its version from `name`.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let name = name.into();
        let version = parse_version(&name);
        Self {
            name,
            path: path.into(),
            version,
        }
    }
}

/// Returns the artifact with the highest version. On ties the first artifact
/// in slice order wins.
pub fn latest(artifacts: &[ModelArtifact]) -> Option<&ModelArtifact> {
    artifacts.iter().fold(None, |best, candidate| match best {
        Some(current) if candidate.version <= current.version => Some(current),
        _ => Some(candidate),
    })
}

/// Returns the first artifact whose version equals the version parsed from
/// `version`, so `"1.0.0"` and `"v1.0.0"` select the same artifact.
pub fn by_version<'a>(
    artifacts: &'a [ModelArtifact],
    version: &str,
) -> Option<&'a ModelArtifact> {
    let wanted = parse_version(version);
    artifacts.iter().find(|a| a.version == wanted)
}

/// Returns the artifact with exactly this name.
pub fn by_name<'a>(artifacts: &'a [ModelArtifact], name: &str) -> Option<&'a ModelArtifact> {
    artifacts.iter().find(|a| a.name == name)
}

/// The artifacts found in one model directory.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    dir: PathBuf,
    artifacts: Vec<ModelArtifact>,
}

impl ModelRegistry {
    /// Scans `dir` for model artifacts.
    ///
    /// Entries are ordered by name so that tie-breaking in [`latest`] does not
    /// depend on the platform's directory iteration order. Entries that do not
    /// start with `model` or whose names are not valid UTF-8 are skipped.
    pub fn discover(dir: impl AsRef<Path>) -> ClassifyResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ClassifyError::DirectoryNotFound {
                path: dir.to_path_buf(),
            });
        }
        let dir = dir.canonicalize()?;

        let mut artifacts = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.starts_with(MODEL_PREFIX) {
                continue;
            }
            artifacts.push(ModelArtifact::new(name, entry.path()));
        }
        artifacts.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(
            dir = %dir.display(),
            count = artifacts.len(),
            "model artifacts discovered"
        );
        Ok(Self { dir, artifacts })
    }

    /// Builds a registry from already known artifacts.
    pub fn from_artifacts(dir: impl Into<PathBuf>, artifacts: Vec<ModelArtifact>) -> Self {
        Self {
            dir: dir.into(),
            artifacts,
        }
    }

    /// The scanned directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All discovered artifacts in discovery order.
    pub fn artifacts(&self) -> &[ModelArtifact] {
        &self.artifacts
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// The artifact with the highest version.
    pub fn latest(&self) -> ClassifyResult<&ModelArtifact> {
        latest(&self.artifacts).ok_or_else(|| ClassifyError::NoArtifactsFound {
            path: self.dir.clone(),
        })
    }

    /// The first artifact tagged with `version`, if any.
    pub fn by_version(&self, version: &str) -> Option<&ModelArtifact> {
        by_version(&self.artifacts, version)
    }

    /// The artifact named `name`, if any.
    pub fn by_name(&self, name: &str) -> Option<&ModelArtifact> {
        by_name(&self.artifacts, name)
    }

    /// Applies a selection policy. An empty registry or an unmatched selector
    /// is an error since the service cannot start without a model.
    pub fn select(&self, selection: &ModelSelection) -> ClassifyResult<&ModelArtifact> {
        if self.artifacts.is_empty() {
            return Err(ClassifyError::NoArtifactsFound {
                path: self.dir.clone(),
            });
        }
        let found = match selection {
            ModelSelection::Latest => return self.latest(),
            ModelSelection::Version(v) => self.by_version(v),
            ModelSelection::Name(n) => self.by_name(n),
        };
        found.ok_or_else(|| ClassifyError::ArtifactNotFound {
            selector: selection.to_string(),
        })
    }
}
