//! `batchbuild build` command

use anyhow::{bail, Result};

use batchbuild::config;
use batchbuild::ops::batch_build::{self, BuildOptions, BuildResult};
use batchbuild::util::shell::{Shell, Status};
use batchbuild::GlobalContext;

use crate::cli::BuildArgs;

pub fn execute(shell: &Shell, args: BuildArgs) -> Result<i32> {
    let ctx = GlobalContext::from_env()?;
    let Some(devo) = ctx.devo_name() else {
        bail!("no devo set up (DEVO_NAME is not set)");
    };
    shell.note(format!("using devo `{devo}`"));

    let base = config::load_base_config(ctx.config_dir())?;
    let project = config::load_project(ctx.config_dir(), &args.project)?;

    let mut selected = batch_build::select_modules(&project, &base, &args.modules)?;
    if let Some(name) = &args.resume_from {
        selected = batch_build::resume_from(selected, name)?;
    }
    if let Some(name) = &args.resume_after {
        selected = batch_build::resume_after(selected, name)?;
    }

    if args.dry_run {
        println!("would build:");
        for config in &selected {
            println!("- {}", config.flat_get("name")?.unwrap_or_default());
        }
        return Ok(0);
    }

    let opts = BuildOptions {
        no_src: args.no_src,
        src_only: args.src_only,
        refresh_build: args.refresh_build,
        switch_branch: args.switch_branch,
        fatal: args.fatal,
    };
    let result = batch_build::build(&ctx, shell, selected, &opts)?;

    print_summary(shell, &result);
    Ok(if result.is_success() { 0 } else { 1 })
}

fn print_summary(shell: &Shell, result: &BuildResult) {
    shell.headline("summary");

    if !result.vcs_failures.is_empty() {
        shell.error(format!(
            "{} module(s) failed to update/checkout:",
            result.vcs_failures.len()
        ));
        for failure in &result.vcs_failures {
            shell.note(format!("{}: {}", failure.module, failure.error));
            shell.note(format!(
                "{}: see {}",
                failure.module,
                failure.log_file.display()
            ));
        }
    }

    if !result.build_failures.is_empty() {
        shell.error(format!(
            "{} module(s) failed to build:",
            result.build_failures.len()
        ));
        for failure in &result.build_failures {
            shell.note(format!("{}: {}", failure.module, failure.error));
            shell.note(format!(
                "{}: see {}",
                failure.module,
                failure.log_file.display()
            ));
        }
    }

    if result.is_success() {
        shell.status(Status::Finished, "all modules updated and built successfully");
    }
}
