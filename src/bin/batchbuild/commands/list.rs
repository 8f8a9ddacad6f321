//! `batchbuild list` command

use anyhow::Result;

use batchbuild::ops::list::list_modules;
use batchbuild::GlobalContext;

use crate::cli::ListArgs;

pub fn execute(args: ListArgs) -> Result<i32> {
    let config_dir = GlobalContext::config_dir_from_env();
    let listed = list_modules(&config_dir, args.project.as_deref())?;

    for project in listed {
        println!("{}", project.project);
        for module in project.modules {
            println!("- {module}");
        }
    }
    Ok(0)
}
