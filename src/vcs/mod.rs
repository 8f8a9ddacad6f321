//! Version-control adapters.
//!
//! Five heterogeneous tools (svn, git, bzr, hg, plus two svn/git
//! variants) are normalized behind one checkout / update / switch-branch
//! contract. Each adapter only differs in the command templates it
//! hands to the [`Runner`]; nothing here inspects exit codes - a failing
//! command surfaces as the runner's typed error and retry policy stays
//! with the driver.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Result};

use crate::core::cascade::{flat_value, CascadedConfig};
use crate::util::runner::Runner;

/// The `repo-type` values a module may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcsKind {
    Svn,
    PartialSvn,
    Git,
    KdeGit,
    Bzr,
    Hg,
}

impl FromStr for VcsKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "svn" => Ok(VcsKind::Svn),
            "partialsvn" => Ok(VcsKind::PartialSvn),
            "git" => Ok(VcsKind::Git),
            "kdegit" => Ok(VcsKind::KdeGit),
            "bzr" => Ok(VcsKind::Bzr),
            "hg" => Ok(VcsKind::Hg),
            _ => Err(format!(
                "unknown repo-type `{s}`; expected one of svn, partialsvn, git, kdegit, bzr, hg"
            )),
        }
    }
}

/// Per-kind command payload.
#[derive(Debug, Clone)]
enum Flavor {
    Svn,
    PartialSvn { dirs: Vec<String> },
    Git { branch: String },
    Bzr,
    Hg,
}

/// The version-control strategy bound to one module.
///
/// Stateless apart from the command context captured at construction:
/// the repository URL, the checkout destination name, the directory the
/// checkout command runs in and the working-copy directory.
#[derive(Debug, Clone)]
pub struct Vcs {
    url: String,
    dest: String,
    base_dir: PathBuf,
    work_dir: PathBuf,
    flavor: Flavor,
}

impl Vcs {
    /// Build the adapter for a module from its resolved configuration.
    ///
    /// `kdegit` behaves exactly like `git` with the URL rewritten to the
    /// short `kde:<basename>` form; `partialsvn` additionally requires
    /// an ordered `repo-dirs` list.
    pub fn new(
        kind: VcsKind,
        config: &CascadedConfig,
        name: &str,
        url: String,
        base_dir: &Path,
        work_dir: &Path,
    ) -> Result<Vcs> {
        let flavor = match kind {
            VcsKind::Svn => Flavor::Svn,
            VcsKind::PartialSvn => Flavor::PartialSvn {
                dirs: repo_dirs(config, name)?,
            },
            VcsKind::Git | VcsKind::KdeGit => {
                let mut branch = config.flat_get("branch")?.unwrap_or_default();
                if branch.is_empty() {
                    branch = "master".to_string();
                }
                Flavor::Git { branch }
            }
            VcsKind::Bzr => Flavor::Bzr,
            VcsKind::Hg => Flavor::Hg,
        };

        let url = if kind == VcsKind::KdeGit {
            format!("kde:{}", basename(name))
        } else {
            url
        };

        Ok(Vcs {
            url,
            dest: name.to_string(),
            base_dir: base_dir.to_path_buf(),
            work_dir: work_dir.to_path_buf(),
            flavor,
        })
    }

    /// Create the working copy under the source base directory.
    pub fn checkout(&self, runner: &mut Runner) -> Result<()> {
        runner.run(&self.base_dir, &self.checkout_command(), &[], false)?;
        if matches!(self.flavor, Flavor::PartialSvn { .. }) {
            // The sparse checkout only materializes the top-level files;
            // a full update pass pulls in the configured subdirectories.
            self.update(runner)?;
        }
        Ok(())
    }

    /// Synchronize an existing working copy.
    pub fn update(&self, runner: &mut Runner) -> Result<()> {
        for command in self.update_commands() {
            runner.run(&self.work_dir, &command, &[], false)?;
        }
        Ok(())
    }

    /// Move the working copy onto the configured branch.
    ///
    /// A no-op for every kind except git: there we fetch, then check out
    /// the local branch when it already exists (never recreating it) or
    /// create one tracking `origin/<branch>` when it does not. Probing
    /// first avoids both clobbering local work and the ambiguity of a
    /// bare `git checkout <branch>` when several remotes carry the name.
    pub fn switch_branch(&self, runner: &mut Runner) -> Result<()> {
        let Flavor::Git { branch } = &self.flavor else {
            return Ok(());
        };
        runner.run(&self.work_dir, "git fetch", &[], false)?;
        let local_exists = runner.check(&self.work_dir, &local_branch_probe(branch))?;
        runner.run(&self.work_dir, &switch_command(branch, local_exists), &[], false)
    }

    fn checkout_command(&self) -> String {
        match &self.flavor {
            Flavor::Svn => format!("svn checkout {} {}", self.url, self.dest),
            Flavor::PartialSvn { .. } => {
                format!("svn checkout --depth files {} {}", self.url, self.dest)
            }
            Flavor::Git { branch } => {
                let mut cmd = String::from("git clone --recursive");
                if branch != "master" {
                    cmd.push_str(" --branch ");
                    cmd.push_str(branch);
                }
                cmd.push(' ');
                cmd.push_str(&self.url);
                cmd.push(' ');
                cmd.push_str(&self.dest);
                cmd
            }
            Flavor::Bzr => format!("bzr branch {} {}", self.url, self.dest),
            Flavor::Hg => format!("hg clone {} {}", self.url, self.dest),
        }
    }

    fn update_commands(&self) -> Vec<String> {
        match &self.flavor {
            Flavor::Svn => vec!["svn up --non-interactive".to_string()],
            Flavor::PartialSvn { dirs } => dirs
                .iter()
                .map(|dir| format!("svn up --non-interactive {dir}"))
                .collect(),
            Flavor::Git { .. } => vec![
                "git pull --rebase".to_string(),
                "git submodule update".to_string(),
            ],
            Flavor::Bzr => vec!["bzr pull".to_string()],
            Flavor::Hg => vec!["hg pull".to_string()],
        }
    }
}

fn local_branch_probe(branch: &str) -> String {
    format!("git show-ref --verify --quiet refs/heads/{branch}")
}

fn switch_command(branch: &str, local_exists: bool) -> String {
    if local_exists {
        format!("git checkout {branch}")
    } else {
        format!("git checkout -b {branch} origin/{branch}")
    }
}

fn repo_dirs(config: &CascadedConfig, name: &str) -> Result<Vec<String>> {
    match config.get("repo-dirs") {
        Some(serde_yaml::Value::Sequence(seq)) => {
            let mut dirs = Vec::with_capacity(seq.len());
            for value in seq {
                match flat_value(value) {
                    Some(dir) => dirs.push(dir),
                    None => bail!("module `{name}`: repo-dirs entries must be scalars"),
                }
            }
            Ok(dirs)
        }
        Some(_) => bail!("module `{name}`: repo-dirs must be a list of paths"),
        None => bail!("module `{name}`: repo-type partialsvn requires repo-dirs"),
    }
}

fn basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
