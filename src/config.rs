//! Project configuration files.
//!
//! The config directory holds one YAML file per project plus an
//! optional `_base.yaml` supplying user-wide defaults (the bottom layer
//! of the cascade). A project file looks like:
//!
//! ```yaml
//! global:
//!   configure-options: -DCMAKE_BUILD_TYPE=Debug
//! modules:
//!   - name: kdelibs
//!     repo-type: git
//!     repo-url: git://anongit.kde.org/kdelibs
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_yaml::Mapping;

/// File supplying the base layer of the cascade.
pub const BASE_CONFIG_NAME: &str = "_base.yaml";

/// One parsed project file: the shared `global` mapping plus the
/// ordered module entries.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub global: Mapping,
    #[serde(default)]
    pub modules: Vec<Mapping>,
}

/// Read a module entry's own `name` field.
pub fn module_name(module: &Mapping) -> Option<&str> {
    module.get("name").and_then(|value| value.as_str())
}

/// Load `_base.yaml` from the config directory; missing file means an
/// empty base layer.
pub fn load_base_config(config_dir: &Path) -> Result<Mapping> {
    let path = config_dir.join(BASE_CONFIG_NAME);
    if !path.exists() {
        return Ok(Mapping::new());
    }
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

/// Resolve a project name to its config file.
///
/// The `.yaml` suffix is appended when absent; the name is tried as
/// given (so paths work) before falling back to the config directory.
pub fn resolve_project_file(config_dir: &Path, name: &str) -> Result<PathBuf> {
    let file_name = if name.ends_with(".yaml") {
        name.to_string()
    } else {
        format!("{name}.yaml")
    };
    for candidate in [PathBuf::from(&file_name), config_dir.join(&file_name)] {
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    bail!(
        "no project config named `{}` (looked for {} in {})",
        name,
        file_name,
        config_dir.display()
    )
}

/// Load a project config by name or path.
pub fn load_project(config_dir: &Path, name: &str) -> Result<ProjectConfig> {
    load_project_file(&resolve_project_file(config_dir, name)?)
}

/// Load a project config from an exact file path.
pub fn load_project_file(path: &Path) -> Result<ProjectConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

/// List the project files in the config directory, sorted by name.
/// `_base.yaml` is not a project and is skipped.
pub fn list_project_files(config_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries = fs::read_dir(config_dir)
        .with_context(|| format!("failed to read directory: {}", config_dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if file_name.ends_with(".yaml") && file_name != BASE_CONFIG_NAME {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
