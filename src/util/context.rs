//! Global context for batchbuild operations.
//!
//! Everything the pipeline needs from the hosting environment is read
//! once, here, and threaded down explicitly. No component below the
//! entry point touches the process environment (the lone exception is
//! `$VAR` expansion inside `repo-url` values).

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Subdirectory of the overlay dir holding the batchbuild configs.
const CONFIG_SUBDIR: &str = "bb";

/// Global context containing the directory layout of the active devo.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Directory the working copies are checked out under
    source_base_dir: PathBuf,

    /// Directory the per-module build directories live under
    build_base_dir: PathBuf,

    /// Directory holding the project config files
    config_dir: PathBuf,

    /// Name of the active devo, if one is set up
    devo_name: Option<String>,
}

impl GlobalContext {
    /// Create a context with explicit directories.
    pub fn new(
        source_base_dir: impl Into<PathBuf>,
        build_base_dir: impl Into<PathBuf>,
        config_dir: impl Into<PathBuf>,
    ) -> Self {
        GlobalContext {
            source_base_dir: source_base_dir.into(),
            build_base_dir: build_base_dir.into(),
            config_dir: config_dir.into(),
            devo_name: None,
        }
    }

    /// Set the devo name.
    pub fn with_devo_name(mut self, name: impl Into<String>) -> Self {
        self.devo_name = Some(name.into());
        self
    }

    /// Create a context from the `DEVO_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let source_base_dir = env::var_os("DEVO_SOURCE_BASE_DIR")
            .map(PathBuf::from)
            .context("DEVO_SOURCE_BASE_DIR is not set")?;
        let build_base_dir = env::var_os("DEVO_BUILD_BASE_DIR")
            .map(PathBuf::from)
            .context("DEVO_BUILD_BASE_DIR is not set")?;

        let mut ctx = GlobalContext::new(source_base_dir, build_base_dir, Self::config_dir_from_env());
        ctx.devo_name = env::var("DEVO_NAME").ok();
        Ok(ctx)
    }

    /// Resolve the config directory from `DEVO_OVERLAY_DIR`, defaulting
    /// to `~/.devo`. Listing works without a full devo environment, so
    /// this never fails.
    pub fn config_dir_from_env() -> PathBuf {
        let overlay = env::var_os("DEVO_OVERLAY_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|home| home.join(".devo"))
                    .unwrap_or_else(|| PathBuf::from(".devo"))
            });
        overlay.join(CONFIG_SUBDIR)
    }

    /// Get the source base directory.
    pub fn source_base_dir(&self) -> &Path {
        &self.source_base_dir
    }

    /// Get the build base directory.
    pub fn build_base_dir(&self) -> &Path {
        &self.build_base_dir
    }

    /// Get the config directory.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get the name of the active devo, if any.
    pub fn devo_name(&self) -> Option<&str> {
        self.devo_name.as_deref()
    }

    /// Get the directory the per-module log files are written to.
    pub fn log_dir(&self) -> PathBuf {
        self.build_base_dir.join("log")
    }
}
