//! CLI integration tests for batchbuild.
//!
//! These tests drive the real binary against a temporary devo layout:
//! an overlay dir with project configs, plus empty source and build
//! base directories. Phase commands are plain `echo`/`false` so no VCS
//! or build tool is needed.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// A throwaway devo environment.
struct Devo {
    tmp: TempDir,
}

impl Devo {
    fn new() -> Devo {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("overlay/bb")).unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        fs::create_dir_all(tmp.path().join("build")).unwrap();
        Devo { tmp }
    }

    fn config_dir(&self) -> PathBuf {
        self.tmp.path().join("overlay/bb")
    }

    fn log_dir(&self) -> PathBuf {
        self.tmp.path().join("build/log")
    }

    fn write_project(&self, name: &str, contents: &str) {
        fs::write(self.config_dir().join(name), contents).unwrap();
    }

    /// Get the batchbuild binary with the devo environment applied.
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("batchbuild").unwrap();
        cmd.env("DEVO_OVERLAY_DIR", self.tmp.path().join("overlay"))
            .env("DEVO_SOURCE_BASE_DIR", self.tmp.path().join("src"))
            .env("DEVO_BUILD_BASE_DIR", self.tmp.path().join("build"))
            .env("DEVO_NAME", "test-devo");
        cmd
    }
}

const ECHO_PROJECT: &str = r#"global:
  configure: echo configured
  build: echo built
  install: ""
modules:
  - name: alpha
    repo-type: git
  - name: beta
    repo-type: git
  - name: gamma
    repo-type: git
"#;

// ============================================================================
// batchbuild list
// ============================================================================

#[test]
fn test_list_single_project() {
    let devo = Devo::new();
    devo.write_project("kde.yaml", ECHO_PROJECT);

    devo.cmd()
        .args(["list", "kde"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha"))
        .stdout(predicate::str::contains("beta"))
        .stdout(predicate::str::contains("gamma"));
}

#[test]
fn test_list_all_projects_sorted() {
    let devo = Devo::new();
    devo.write_project("zeta.yaml", "modules:\n  - name: z-mod\n");
    devo.write_project("alpha.yaml", "modules:\n  - name: a-mod\n");
    devo.write_project("_base.yaml", "{}\n");

    let output = devo.cmd().arg("list").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let alpha_at = stdout.find("alpha.yaml").unwrap();
    let zeta_at = stdout.find("zeta.yaml").unwrap();
    assert!(alpha_at < zeta_at);
    assert!(!stdout.contains("_base.yaml"));
}

#[test]
fn test_list_unknown_project() {
    let devo = Devo::new();

    devo.cmd()
        .args(["list", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no project config named `missing`"));
}

// ============================================================================
// batchbuild build --dry-run
// ============================================================================

#[test]
fn test_dry_run_lists_modules() {
    let devo = Devo::new();
    devo.write_project("kde.yaml", ECHO_PROJECT);

    devo.cmd()
        .args(["build", "kde", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("would build:"))
        .stdout(predicate::str::contains("- alpha"))
        .stdout(predicate::str::contains("- gamma"));
}

#[test]
fn test_dry_run_with_resume_from() {
    let devo = Devo::new();
    devo.write_project("kde.yaml", ECHO_PROJECT);

    devo.cmd()
        .args(["build", "kde", "--dry-run", "--resume-from", "beta"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- beta"))
        .stdout(predicate::str::contains("- gamma"))
        .stdout(predicate::str::contains("- alpha").not());
}

#[test]
fn test_dry_run_with_resume_after() {
    let devo = Devo::new();
    devo.write_project("kde.yaml", ECHO_PROJECT);

    devo.cmd()
        .args(["build", "kde", "--dry-run", "--resume-after", "beta"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- gamma"))
        .stdout(predicate::str::contains("- beta").not());
}

// ============================================================================
// batchbuild build
// ============================================================================

#[test]
fn test_build_succeeds_with_echo_commands() {
    let devo = Devo::new();
    devo.write_project("kde.yaml", ECHO_PROJECT);

    devo.cmd()
        .args(["build", "kde", "--no-src"])
        .assert()
        .success()
        .stderr(predicate::str::contains("using devo `test-devo`"))
        .stderr(predicate::str::contains(
            "all modules updated and built successfully",
        ));

    for name in ["alpha", "beta", "gamma"] {
        let log = fs::read_to_string(devo.log_dir().join(format!("{name}.log"))).unwrap();
        assert!(log.contains("batchbuild: echo configured"));
        assert!(log.contains("built"));
    }
}

#[test]
fn test_build_selected_module_only() {
    let devo = Devo::new();
    devo.write_project("kde.yaml", ECHO_PROJECT);

    devo.cmd()
        .args(["build", "kde", "beta", "--no-src"])
        .assert()
        .success();

    assert!(devo.log_dir().join("beta.log").exists());
    assert!(!devo.log_dir().join("alpha.log").exists());
}

#[test]
fn test_build_unknown_module_fails() {
    let devo = Devo::new();
    devo.write_project("kde.yaml", ECHO_PROJECT);

    devo.cmd()
        .args(["build", "kde", "nosuch", "--no-src"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown module `nosuch`"));
}

#[test]
fn test_build_unknown_resume_target_fails() {
    let devo = Devo::new();
    devo.write_project("kde.yaml", ECHO_PROJECT);

    devo.cmd()
        .args(["build", "kde", "--resume-from", "nosuch"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown module `nosuch`"));
}

#[test]
fn test_resume_after_last_module_fails() {
    let devo = Devo::new();
    devo.write_project("kde.yaml", ECHO_PROJECT);

    devo.cmd()
        .args(["build", "kde", "--resume-after", "gamma"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no module after `gamma`"));
}

#[test]
fn test_failing_module_recorded_and_run_continues() {
    let devo = Devo::new();
    devo.write_project(
        "kde.yaml",
        r#"global:
  configure: echo configured
  install: ""
modules:
  - name: broken
    repo-type: git
    build: "false"
  - name: after
    repo-type: git
    build: echo fine
"#,
    );

    devo.cmd()
        .args(["build", "kde", "--no-src"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("broken failed to build"))
        .stderr(predicate::str::contains("1 module(s) failed to build"));

    // The module after the failure still ran.
    assert!(devo.log_dir().join("after.log").exists());
}

#[test]
fn test_fatal_stops_at_first_failure() {
    let devo = Devo::new();
    devo.write_project(
        "kde.yaml",
        r#"global:
  configure: echo configured
  install: ""
modules:
  - name: broken
    repo-type: git
    build: "false"
  - name: after
    repo-type: git
    build: echo fine
"#,
    );

    devo.cmd()
        .args(["build", "kde", "--no-src", "--fatal"])
        .assert()
        .failure()
        .code(1);

    assert!(!devo.log_dir().join("after.log").exists());
}

#[test]
fn test_vcs_failure_reported_in_summary() {
    let devo = Devo::new();
    // The checkout command fails whether or not svn is installed.
    devo.write_project(
        "kde.yaml",
        "global: {}\nmodules:\n  - name: lost\n    repo-type: svn\n    repo-url: file:///nonexistent/repo\n",
    );

    devo.cmd()
        .args(["build", "kde", "--src-only"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("lost failed to update/checkout"))
        .stderr(predicate::str::contains("1 module(s) failed to update/checkout"));

    assert!(devo.log_dir().join("lost.log").exists());
}

#[test]
fn test_no_src_and_src_only_conflict() {
    let devo = Devo::new();
    devo.write_project("kde.yaml", ECHO_PROJECT);

    // clap rejects the combination before anything runs.
    devo.cmd()
        .args(["build", "kde", "--no-src", "--src-only"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_resume_flags_conflict() {
    let devo = Devo::new();
    devo.write_project("kde.yaml", ECHO_PROJECT);

    devo.cmd()
        .args([
            "build",
            "kde",
            "--resume-from",
            "alpha",
            "--resume-after",
            "beta",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_build_requires_devo_name() {
    let devo = Devo::new();
    devo.write_project("kde.yaml", ECHO_PROJECT);

    devo.cmd()
        .args(["build", "kde", "--no-src"])
        .env_remove("DEVO_NAME")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no devo set up"));
}

#[test]
fn test_build_requires_base_dirs() {
    let devo = Devo::new();
    devo.write_project("kde.yaml", ECHO_PROJECT);

    devo.cmd()
        .args(["build", "kde", "--no-src"])
        .env_remove("DEVO_SOURCE_BASE_DIR")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DEVO_SOURCE_BASE_DIR"));
}

#[test]
fn test_unknown_project_fails() {
    let devo = Devo::new();

    devo.cmd()
        .args(["build", "nosuch", "--no-src"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no project config named `nosuch`"));
}

#[test]
fn test_base_config_supplies_defaults() {
    let devo = Devo::new();
    devo.write_project(
        "_base.yaml",
        "configure: echo base-configured\nbuild: \"\"\ninstall: \"\"\n",
    );
    devo.write_project(
        "kde.yaml",
        "global: {}\nmodules:\n  - name: solo\n    repo-type: git\n",
    );

    devo.cmd()
        .args(["build", "kde", "--no-src"])
        .assert()
        .success();

    let log = fs::read_to_string(devo.log_dir().join("solo.log")).unwrap();
    assert!(log.contains("base-configured"));
}

// ============================================================================
// batchbuild doctor
// ============================================================================

#[test]
fn test_doctor_reports_sh() {
    Command::cargo_bin("batchbuild")
        .unwrap()
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("sh"));
}

// ============================================================================
// batchbuild completions
// ============================================================================

#[test]
fn test_completions_bash() {
    Command::cargo_bin("batchbuild")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("batchbuild"));
}
