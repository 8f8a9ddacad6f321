//! Listing projects and their modules.

use std::path::Path;

use anyhow::Result;

use crate::config::{list_project_files, load_project, load_project_file, module_name, ProjectConfig};

/// The module names of one project file.
#[derive(Debug)]
pub struct ProjectModules {
    pub project: String,
    pub modules: Vec<String>,
}

/// Collect the module names of one project, or of every project file in
/// the config directory (sorted by file name) when `project` is `None`.
pub fn list_modules(config_dir: &Path, project: Option<&str>) -> Result<Vec<ProjectModules>> {
    match project {
        Some(name) => {
            let config = load_project(config_dir, name)?;
            Ok(vec![ProjectModules {
                project: name.to_string(),
                modules: names_of(&config),
            }])
        }
        None => {
            let mut all = Vec::new();
            for path in list_project_files(config_dir)? {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let config = load_project_file(&path)?;
                all.push(ProjectModules {
                    project: file_name,
                    modules: names_of(&config),
                });
            }
            Ok(all)
        }
    }
}

fn names_of(project: &ProjectConfig) -> Vec<String> {
    project
        .modules
        .iter()
        .filter_map(module_name)
        .map(String::from)
        .collect()
}
