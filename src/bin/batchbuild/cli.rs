//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};

/// batchbuild - batch checkout-and-build orchestration for multi-module
/// source trees
#[derive(Parser)]
#[command(name = "batchbuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Print command output to the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check out, update and build the modules of a project
    Build(BuildArgs),

    /// List available projects and their modules
    List(ListArgs),

    /// Check that the external tools are available
    Doctor,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Project config to build (a name in the config dir, or a path)
    pub project: String,

    /// Restrict the run to these modules
    pub modules: Vec<String>,

    /// Just list what would be built
    #[arg(long)]
    pub dry_run: bool,

    /// Do not update or check out source code
    #[arg(long, conflicts_with = "src_only")]
    pub no_src: bool,

    /// Only update source code, skip the build phase
    #[arg(long)]
    pub src_only: bool,

    /// Resume the run from MODULE (inclusive)
    #[arg(long, value_name = "MODULE")]
    pub resume_from: Option<String>,

    /// Resume the run after MODULE (exclusive)
    #[arg(long, value_name = "MODULE", conflicts_with = "resume_from")]
    pub resume_after: Option<String>,

    /// Delete build directories before configuring
    #[arg(long)]
    pub refresh_build: bool,

    /// Switch each checkout to its configured branch before updating
    #[arg(long)]
    pub switch_branch: bool,

    /// Stop at the first failing module
    #[arg(long)]
    pub fatal: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// Project to list (defaults to every project in the config dir)
    pub project: Option<String>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
