//! The sequential build pipeline.
//!
//! Resolves the ordered module list, applies the resume filters, then
//! drives every module through source sync and the build phase,
//! classifying failures and deciding whether to carry on.

use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde_yaml::Mapping;

use crate::config::{module_name, ProjectConfig};
use crate::core::cascade::CascadedConfig;
use crate::core::module::Module;
use crate::util::context::GlobalContext;
use crate::util::runner::Runner;
use crate::util::shell::Shell;

/// Options for the build pipeline.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Do not update or check out source code
    pub no_src: bool,

    /// Only sync sources, skip the build phase
    pub src_only: bool,

    /// Delete build directories before configuring
    pub refresh_build: bool,

    /// Switch each checkout to its configured branch before updating
    pub switch_branch: bool,

    /// Stop at the first failing module
    pub fatal: bool,
}

/// One recorded failure: which module, what went wrong, where to look.
#[derive(Debug)]
pub struct FailureRecord {
    pub module: String,
    pub error: String,
    pub log_file: PathBuf,
}

/// Accumulated outcome of a pipeline run.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Modules that failed to check out, update or switch branch
    pub vcs_failures: Vec<FailureRecord>,

    /// Modules that failed to configure, build or install
    pub build_failures: Vec<FailureRecord>,
}

impl BuildResult {
    /// Whether every module made it through both phases.
    pub fn is_success(&self) -> bool {
        self.vcs_failures.is_empty() && self.build_failures.is_empty()
    }
}

/// Resolve the module configs to process.
///
/// With no names, every module of the project in file order. With
/// names, each must match a module entry (an unknown name aborts the
/// whole run) and the result keeps the project file's declaration
/// order, not the argument order.
pub fn select_modules(
    project: &ProjectConfig,
    base: &Mapping,
    names: &[String],
) -> Result<Vec<CascadedConfig>> {
    if !names.is_empty() {
        let available: Vec<&str> = project.modules.iter().filter_map(module_name).collect();
        for name in names {
            if !available.iter().any(|candidate| candidate == name) {
                bail!(
                    "unknown module `{}`\navailable modules: {}",
                    name,
                    if available.is_empty() {
                        "(none)".to_string()
                    } else {
                        available.join(", ")
                    }
                );
            }
        }
    }

    let selected = project
        .modules
        .iter()
        .filter(|module| {
            names.is_empty()
                || module_name(module).is_some_and(|name| names.iter().any(|n| n == name))
        })
        .map(|module| CascadedConfig::new(module.clone(), project.global.clone(), base.clone()))
        .collect();
    Ok(selected)
}

/// Truncate the list to start at `name`, inclusive.
pub fn resume_from(mut configs: Vec<CascadedConfig>, name: &str) -> Result<Vec<CascadedConfig>> {
    let idx = position_of(&configs, name)?;
    Ok(configs.split_off(idx))
}

/// Truncate the list to start after `name`. Naming the last module
/// leaves nothing to do and is an error.
pub fn resume_after(mut configs: Vec<CascadedConfig>, name: &str) -> Result<Vec<CascadedConfig>> {
    let idx = position_of(&configs, name)?;
    if idx + 1 == configs.len() {
        bail!("no module after `{name}`");
    }
    Ok(configs.split_off(idx + 1))
}

fn position_of(configs: &[CascadedConfig], name: &str) -> Result<usize> {
    configs
        .iter()
        .position(|config| {
            config
                .flat_get("name")
                .ok()
                .flatten()
                .is_some_and(|n| n == name)
        })
        .with_context(|| format!("unknown module `{name}`"))
}

/// Process the selected modules in order.
///
/// All modules are validated and constructed up front, so configuration
/// errors abort before any subprocess runs. Per module: optional branch
/// switch and source sync (the VCS phase), then configure/build/install
/// (the build phase). Failures land in the matching [`BuildResult`]
/// bucket; the loop carries on unless `fatal` is set, in which case the
/// partial result is returned immediately.
pub fn build(
    ctx: &GlobalContext,
    shell: &Shell,
    configs: Vec<CascadedConfig>,
    opts: &BuildOptions,
) -> Result<BuildResult> {
    let modules = configs
        .into_iter()
        .map(|config| Module::from_config(config, ctx))
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!("processing {} modules", modules.len());

    let log_dir = ctx.log_dir();
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create directory: {}", log_dir.display()))?;

    let mut result = BuildResult::default();
    let total = modules.len();
    for (idx, module) in modules.iter().enumerate() {
        shell.headline(format!("[{}/{}] {}", idx + 1, total, module.name()));

        let log_file = log_dir.join(format!("{}.log", module.name().replace('/', "_")));
        let log = File::create(&log_file)
            .with_context(|| format!("failed to create log file: {}", log_file.display()))?;
        let mut runner = Runner::new(log, shell.is_verbose());

        if let Err(err) = sync_source(module, &mut runner, opts) {
            shell.error(format!(
                "{} failed to update/checkout: {:#}",
                module.name(),
                err
            ));
            shell.note(format!("see {}", log_file.display()));
            result.vcs_failures.push(FailureRecord {
                module: module.name().to_string(),
                error: format!("{err:#}"),
                log_file: log_file.clone(),
            });
            if opts.fatal {
                return Ok(result);
            }
        }

        if !opts.src_only {
            if let Err(err) = build_module(module, &mut runner, opts) {
                shell.error(format!("{} failed to build: {:#}", module.name(), err));
                shell.note(format!("see {}", log_file.display()));
                result.build_failures.push(FailureRecord {
                    module: module.name().to_string(),
                    error: format!("{err:#}"),
                    log_file,
                });
                if opts.fatal {
                    return Ok(result);
                }
            }
        }
    }
    Ok(result)
}

/// The VCS phase: optional branch switch, then checkout or update.
fn sync_source(module: &Module, runner: &mut Runner, opts: &BuildOptions) -> Result<()> {
    if opts.switch_branch && module.has_checkout() {
        module.switch_branch(runner)?;
    }
    if opts.no_src {
        return Ok(());
    }
    if module.has_checkout() {
        module.update(runner)
    } else {
        module.checkout(runner)
    }
}

/// The build phase: optional clean, configure, build, install.
fn build_module(module: &Module, runner: &mut Runner, opts: &BuildOptions) -> Result<()> {
    if opts.refresh_build {
        module.refresh_build()?;
    }
    module.configure(runner)?;
    module.build(runner)?;
    module.install(runner)
}
