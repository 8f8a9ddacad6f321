//! One buildable unit: a VCS-backed source tree plus a build recipe.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::core::cascade::CascadedConfig;
use crate::util::context::GlobalContext;
use crate::util::runner::Runner;
use crate::vcs::{Vcs, VcsKind};

/// A module bound to its resolved configuration and VCS adapter.
///
/// Constructed fresh per build attempt; whether a checkout exists is
/// always decided by looking at the filesystem, not by internal state.
#[derive(Debug)]
pub struct Module {
    name: String,
    source_base: PathBuf,
    src_dir: PathBuf,
    build_dir: PathBuf,
    config: CascadedConfig,
    vcs: Vcs,
}

impl Module {
    /// Validate a module's configuration and derive its directories.
    ///
    /// A missing or empty `name`, a missing or unknown `repo-type` and a
    /// malformed `repo-dirs` are all configuration errors: they fail
    /// here, before any subprocess runs.
    pub fn from_config(config: CascadedConfig, ctx: &GlobalContext) -> Result<Module> {
        let name = config
            .flat_get("name")?
            .filter(|name| !name.is_empty())
            .ok_or_else(|| anyhow!("module entry is missing a `name`"))?;

        let repo_type = config
            .flat_get("repo-type")?
            .ok_or_else(|| anyhow!("module `{name}` is missing `repo-type`"))?;
        let kind: VcsKind = repo_type
            .parse()
            .map_err(|err| anyhow!("module `{name}`: {err}"))?;

        // Expanding vars is useful for tests (file://$BB_FIXTURES/...).
        let url = expand_env_vars(&config.flat_get("repo-url")?.unwrap_or_default());

        let source_base = ctx.source_base_dir().to_path_buf();
        let src_dir = source_base.join(&name);
        let build_dir = ctx.build_base_dir().join(&name);

        let vcs = Vcs::new(kind, &config, &name, url, &source_base, &src_dir)?;

        Ok(Module {
            name,
            source_base,
            src_dir,
            build_dir,
            config,
            vcs,
        })
    }

    /// The module's resolved name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The module's working-copy directory.
    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    /// The module's build directory.
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Whether a working copy exists on disk.
    pub fn has_checkout(&self) -> bool {
        self.src_dir.exists()
    }

    /// Create the working copy.
    pub fn checkout(&self, runner: &mut Runner) -> Result<()> {
        fs::create_dir_all(&self.source_base).with_context(|| {
            format!("failed to create directory: {}", self.source_base.display())
        })?;
        self.vcs.checkout(runner)
    }

    /// Synchronize the working copy.
    pub fn update(&self, runner: &mut Runner) -> Result<()> {
        self.vcs.update(runner)
    }

    /// Move the working copy onto the configured branch.
    pub fn switch_branch(&self, runner: &mut Runner) -> Result<()> {
        self.vcs.switch_branch(runner)
    }

    /// Delete the build directory so the next configure starts clean.
    pub fn refresh_build(&self) -> Result<()> {
        if self.build_dir.exists() {
            tracing::info!("removing {}", self.build_dir.display());
            fs::remove_dir_all(&self.build_dir).with_context(|| {
                format!("failed to remove directory: {}", self.build_dir.display())
            })?;
        }
        Ok(())
    }

    /// Run the configure command in the build directory, creating it
    /// first if needed.
    pub fn configure(&self, runner: &mut Runner) -> Result<()> {
        fs::create_dir_all(&self.build_dir).with_context(|| {
            format!("failed to create directory: {}", self.build_dir.display())
        })?;
        let base = match self.config.flat_get("configure")? {
            Some(configure) => configure,
            None => format!("devo_cmake {}", self.src_dir.display()),
        };
        let command = self.compose(base, "configure-options", "configure-extra-options")?;
        runner.run(&self.build_dir, &command, &self.phase_env(), false)
    }

    /// Run the build command, with progress reporting.
    ///
    /// A missing build directory triggers configure first. A build
    /// command explicitly set to the empty string is a deliberate no-op
    /// (header-only modules).
    pub fn build(&self, runner: &mut Runner) -> Result<()> {
        if !self.build_dir.exists() {
            self.configure(runner)?;
        }
        let Some(build) = self.phase_command("build", "make")? else {
            return Ok(());
        };
        let command = self.compose(build, "build-options", "build-extra-options")?;
        runner.run(&self.build_dir, &command, &self.phase_env(), true)
    }

    /// Run the install command; empty command is a no-op.
    pub fn install(&self, runner: &mut Runner) -> Result<()> {
        let Some(install) = self.phase_command("install", "make install")? else {
            return Ok(());
        };
        let command = self.compose(install, "install-options", "install-extra-options")?;
        runner.run(&self.build_dir, &command, &self.phase_env(), false)
    }

    /// Resolve a phase command, mapping the empty string to the no-op
    /// sentinel and a missing key to the default.
    fn phase_command(&self, key: &str, default: &str) -> Result<Option<String>> {
        Ok(match self.config.flat_get(key)? {
            Some(command) if command.is_empty() => None,
            Some(command) => Some(command),
            None => Some(default.to_string()),
        })
    }

    fn compose(&self, base: String, opts_key: &str, extra_key: &str) -> Result<String> {
        let opts = self.config.flat_get(opts_key)?.unwrap_or_default();
        let extra = self.config.flat_get(extra_key)?.unwrap_or_default();
        Ok(format!("{base} {opts} {extra}"))
    }

    fn phase_env(&self) -> Vec<(String, String)> {
        vec![
            (
                "DEVO_SOURCE_DIR".to_string(),
                self.src_dir.display().to_string(),
            ),
            (
                "DEVO_BUILD_DIR".to_string(),
                self.build_dir.display().to_string(),
            ),
        ]
    }
}

/// Minimal `$VAR` / `${VAR}` expansion; unset variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];
        let (name, tail, braced) = if let Some(inner) = rest.strip_prefix('{') {
            match inner.find('}') {
                Some(end) => (&inner[..end], &inner[end + 1..], true),
                None => {
                    out.push('$');
                    continue;
                }
            }
        } else {
            let end = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            (&rest[..end], &rest[end..], false)
        };
        if name.is_empty() {
            out.push('$');
            if braced {
                out.push_str("{}");
            }
        } else {
            match std::env::var(name) {
                Ok(value) => out.push_str(&value),
                Err(_) => {
                    if braced {
                        out.push_str(&format!("${{{name}}}"));
                    } else {
                        out.push('$');
                        out.push_str(name);
                    }
                }
            }
        }
        rest = tail;
    }
    out.push_str(rest);
    out
}
