//! Model artifact management.

pub mod registry;

pub use registry::{parse_version, ModelArtifact, ModelRegistry, VersionTag};
