//! Patch profiles: per-deployment configuration of what to find and what to
//! write.
//!
//! Patterns and patched values are configuration data, not mechanism
//! constants; restoration values never appear here because restore always
//! uses the snapshot captured before patching.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pattern::Pattern;

/// One patch location: the pattern that finds it and the scalar to write
/// when the patch is enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchTarget {
    pub name: String,
    pub pattern: String,
    pub patched_value: i16,
}

impl PatchTarget {
    pub fn compiled_pattern(&self) -> Result<Pattern> {
        Pattern::compile(&self.pattern)
    }
}

/// A named set of patch targets for one deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchProfile {
    pub name: String,
    pub targets: Vec<PatchTarget>,
}

impl PatchProfile {
    pub fn target(&self, name: &str) -> Option<&PatchTarget> {
        self.targets
            .iter()
            .find(|target| target.name.eq_ignore_ascii_case(name))
    }
}

pub fn load_profile<P: AsRef<Path>>(path: P) -> Result<PatchProfile> {
    let content = fs::read_to_string(&path)?;
    let profile = serde_json::from_str(&content)?;
    Ok(profile)
}

pub fn save_profile<P: AsRef<Path>>(path: P, profile: &PatchProfile) -> Result<()> {
    let content = serde_json::to_string_pretty(profile)?;
    fs::write(path, content)?;
    Ok(())
}
