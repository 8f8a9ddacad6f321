//! Command execution with streamed logging and progress scraping.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use thiserror::Error;

/// Bracketed percentage emitted by make-style build tools, e.g. `[ 45%]`.
static PERCENT_RX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[ *(\d+%)\]").unwrap());

/// A command exited with a non-zero code (or died to a signal, code -1).
#[derive(Debug, Error)]
#[error("command `{command}` failed with exit code {code}")]
pub struct CommandError {
    pub command: String,
    pub code: i32,
}

/// Runs shell commands for one module, streaming their output to the
/// module's log file.
///
/// The log handle stays open for the whole of the module's processing;
/// the progress indicator is per-invocation and reset at the start of
/// every [`run`](Runner::run).
pub struct Runner {
    log: File,
    verbose: bool,
    progress: Option<ProgressBar>,
}

impl Runner {
    /// Create a runner writing to the given log file.
    pub fn new(log: File, verbose: bool) -> Runner {
        Runner {
            log,
            verbose,
            progress: None,
        }
    }

    /// Run `command` through the shell in `working_dir`.
    ///
    /// The command is echoed with an `HH:MM` stamp to the console and as
    /// a header line to the log. Output (stderr merged into stdout) is
    /// read incrementally; every chunk reaches the log, flushed, before
    /// the next read. In verbose mode chunks are echoed verbatim;
    /// otherwise, with `report_progress` set, `[ NN%]` tokens drive a
    /// single live progress bar. The elapsed duration is printed on
    /// every exit path. A non-zero exit raises [`CommandError`].
    pub fn run(
        &mut self,
        working_dir: &Path,
        command: &str,
        env: &[(String, String)],
        report_progress: bool,
    ) -> Result<()> {
        let command = command.trim();
        let stamp = chrono::Local::now().format("%H:%M");
        if self.verbose {
            eprintln!("{stamp} {command}");
        } else {
            eprint!("{stamp} {command}");
        }
        writeln!(self.log, "batchbuild: {command}").context("failed to write to log file")?;
        self.log.flush()?;

        self.progress = None;
        let start = Instant::now();
        let outcome = self.stream(working_dir, command, env, report_progress);
        if let Some(bar) = self.progress.take() {
            bar.finish_and_clear();
        }
        let took = format!("took {}", format_duration(start.elapsed()));
        if self.verbose {
            eprintln!("{took}");
        } else {
            eprintln!(" - {took}");
        }
        outcome
    }

    fn stream(
        &mut self,
        working_dir: &Path,
        command: &str,
        env: &[(String, String)],
        report_progress: bool,
    ) -> Result<()> {
        let (reader, writer) = std::io::pipe().context("failed to create output pipe")?;
        let stderr_writer = writer.try_clone().context("failed to clone output pipe")?;

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr_writer);
        for (key, value) in env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().with_context(|| {
            format!("failed to spawn `{command}` in {}", working_dir.display())
        })?;
        // The parent's copies of the pipe writers live in `cmd`; drop them
        // or the reader below never sees end-of-file.
        drop(cmd);

        let mut reader = BufReader::new(reader);
        let mut chunk = Vec::new();
        loop {
            chunk.clear();
            let n = reader
                .read_until(b'\n', &mut chunk)
                .context("failed to read command output")?;
            if n == 0 {
                break;
            }
            self.log.write_all(&chunk)?;
            self.log.flush()?;
            if self.verbose {
                eprint!("{}", String::from_utf8_lossy(&chunk));
            } else if report_progress {
                if let Some(token) = extract_progress(&String::from_utf8_lossy(&chunk)) {
                    let percent = token.trim_end_matches('%').parse().unwrap_or(0);
                    self.report_progress(percent);
                }
            }
        }

        let status = child.wait().context("failed to wait for command")?;
        if !status.success() {
            let code = status.code().unwrap_or(-1);
            return Err(CommandError {
                command: command.to_string(),
                code,
            }
            .into());
        }
        Ok(())
    }

    fn report_progress(&mut self, percent: u64) {
        let bar = self.progress.get_or_insert_with(|| {
            // Break the line so the bar does not overwrite the echoed command.
            eprintln!();
            let bar = ProgressBar::new(100);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("[{bar:40.cyan/blue}] {pos:>3}%")
                    .unwrap()
                    .progress_chars("#>-"),
            );
            bar
        });
        bar.set_position(percent.min(100));
    }

    /// Silently run `command` and report whether it succeeded.
    ///
    /// Used for control-flow probes (e.g. "does this local git branch
    /// exist"); nothing is echoed or logged.
    pub fn check(&mut self, working_dir: &Path, command: &str) -> Result<bool> {
        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("failed to run `{command}`"))?;
        Ok(status.success())
    }
}

/// Extract the `NN%` token from a `[ NN%]` progress line, if any.
pub fn extract_progress(line: &str) -> Option<&str> {
    PERCENT_RX
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Format a wall-clock duration as `1h2m5s`.
///
/// Zero-valued leading units are omitted; seconds are always shown.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 || hours > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    out.push_str(&format!("{seconds}s"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn runner(tmp: &TempDir) -> (Runner, std::path::PathBuf) {
        let log_path = tmp.path().join("test.log");
        let log = File::create(&log_path).unwrap();
        (Runner::new(log, false), log_path)
    }

    #[test]
    fn test_run_logs_header_and_output() {
        let tmp = TempDir::new().unwrap();
        let (mut runner, log_path) = runner(&tmp);

        runner.run(tmp.path(), "echo hello", &[], false).unwrap();

        let log = fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("batchbuild: echo hello"));
        assert!(log.contains("hello"));
    }

    #[test]
    fn test_run_merges_stderr_into_log() {
        let tmp = TempDir::new().unwrap();
        let (mut runner, log_path) = runner(&tmp);

        runner
            .run(tmp.path(), "echo out; echo err >&2", &[], false)
            .unwrap();

        let log = fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("out"));
        assert!(log.contains("err"));
    }

    #[test]
    fn test_run_nonzero_exit_is_typed_error() {
        let tmp = TempDir::new().unwrap();
        let (mut runner, _) = runner(&tmp);

        let err = runner.run(tmp.path(), "exit 3", &[], false).unwrap_err();
        let cmd_err = err.downcast_ref::<CommandError>().unwrap();
        assert_eq!(cmd_err.code, 3);
        assert_eq!(cmd_err.command, "exit 3");
    }

    #[test]
    fn test_run_trims_command() {
        let tmp = TempDir::new().unwrap();
        let (mut runner, log_path) = runner(&tmp);

        runner.run(tmp.path(), "  echo trimmed  ", &[], false).unwrap();

        let log = fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("batchbuild: echo trimmed\n"));
    }

    #[test]
    fn test_run_injects_environment() {
        let tmp = TempDir::new().unwrap();
        let (mut runner, log_path) = runner(&tmp);

        let env = vec![("BB_TEST_VALUE".to_string(), "injected".to_string())];
        runner
            .run(tmp.path(), "echo value=$BB_TEST_VALUE", &env, false)
            .unwrap();

        let log = fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("value=injected"));
    }

    #[test]
    fn test_run_uses_working_directory() {
        let tmp = TempDir::new().unwrap();
        let subdir = tmp.path().join("work");
        fs::create_dir(&subdir).unwrap();
        let (mut runner, _) = runner(&tmp);

        runner.run(&subdir, "touch here", &[], false).unwrap();
        assert!(subdir.join("here").exists());
    }

    #[test]
    fn test_check_reports_status_without_failing() {
        let tmp = TempDir::new().unwrap();
        let (mut runner, log_path) = runner(&tmp);

        assert!(runner.check(tmp.path(), "true").unwrap());
        assert!(!runner.check(tmp.path(), "false").unwrap());
        // Probes leave no trace in the log.
        assert_eq!(fs::read_to_string(&log_path).unwrap(), "");
    }

    #[test]
    fn test_extract_progress() {
        assert_eq!(extract_progress("[ 45%] Building CXX object"), Some("45%"));
        assert_eq!(extract_progress("[100%] Linking"), Some("100%"));
        assert_eq!(extract_progress("[  7%] foo"), Some("7%"));
        assert_eq!(extract_progress("plain output line"), None);
        assert_eq!(extract_progress("[no percent]"), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(5)), "5s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h2m5s");
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h0m0s");
    }
}
