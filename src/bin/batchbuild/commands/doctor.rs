//! `batchbuild doctor` command

use anyhow::Result;

use batchbuild::ops::doctor::doctor;

pub fn execute() -> Result<i32> {
    let report = doctor();

    for check in &report.checks {
        let mark = if check.passed {
            "ok"
        } else if check.required {
            "MISSING"
        } else {
            "missing"
        };
        println!("{:<8} {:<6} {}", check.name, mark, check.message);
    }

    if report.all_required_passed() {
        Ok(0)
    } else {
        println!("required tools are missing");
        Ok(1)
    }
}
