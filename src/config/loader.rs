// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{PlanFile, RawPlanFile};
use crate::errors::Result;

/// Read a plan file and deserialize it, without semantic checks.
///
/// Use [`load_and_validate`] to also check dependencies, cycles and
/// durations.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPlanFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let raw: RawPlanFile = toml::from_str(&contents)?;
    Ok(raw)
}

/// Parse and validate a plan held in memory.
pub fn parse_plan_str(contents: &str) -> Result<PlanFile> {
    let raw: RawPlanFile = toml::from_str(contents)?;
    PlanFile::try_from(raw)
}

/// Load a plan file and validate it. This is what the binary uses.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PlanFile> {
    let raw = load_from_path(&path)?;
    PlanFile::try_from(raw)
}

/// `Opqueue.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Opqueue.toml")
}
