// tapkit-core/src/smoke.rs
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tapkit_common::error::{Result, TapkitError};
use tapkit_common::model::{Formula, SmokeTest};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeTestReport {
    pub command: PathBuf,
    pub args: Vec<String>,
    pub expect: String,
    pub stdout: String,
    pub stderr: String,
}

/// Runs the formula's smoke test against the binaries in `keg_path/bin`.
///
/// Passes only when the command exits successfully and its output (stdout or
/// stderr) contains the expected text.
#[instrument(skip_all, fields(formula = %formula.name))]
pub fn run_smoke_test(formula: &Formula, keg_path: &Path) -> Result<SmokeTestReport> {
    let test = formula.smoke_test().ok_or_else(|| {
        TapkitError::TestFailed(format!(
            "{} declares no test and installs no binaries",
            formula.name
        ))
    })?;
    run_test_command(&test, &keg_path.join("bin"))
}

pub(crate) fn run_test_command(test: &SmokeTest, bin_dir: &Path) -> Result<SmokeTestReport> {
    let command = bin_dir.join(&test.command);
    if !command.is_file() {
        return Err(TapkitError::TestFailed(format!(
            "{} is not installed",
            command.display()
        )));
    }
    debug!("Running smoke test: {} {:?}", command.display(), test.args);

    let mut child = Command::new(&command)
        .args(&test.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            error!("Failed to execute {}: {}", command.display(), e);
            TapkitError::CommandExecError(format!("{}: {}", command.display(), e))
        })?;

    // Drain both pipes so a chatty command cannot block on a full buffer.
    let stdout_reader = child.stdout.take().map(drain);
    let stderr_reader = child.stderr.take().map(drain);

    let timeout = Duration::from_secs(test.timeout_secs);
    let status = match child.wait_timeout(timeout).map_err(|e| {
        TapkitError::CommandExecError(format!("{}: {}", command.display(), e))
    })? {
        Some(status) => status,
        None => {
            warn!(
                "{} did not finish within {}s, killing it",
                command.display(),
                test.timeout_secs
            );
            let _ = child.kill();
            let _ = child.wait();
            return Err(TapkitError::TestFailed(format!(
                "`{} {}` did not finish within {}s",
                test.command,
                test.args.join(" "),
                test.timeout_secs
            )));
        }
    };
    let stdout = collect(stdout_reader);
    let stderr = collect(stderr_reader);

    if !status.success() {
        debug!("Stdout:\n{}", stdout.trim());
        debug!("Stderr:\n{}", stderr.trim());
        return Err(TapkitError::TestFailed(format!(
            "`{} {}` exited with {}",
            test.command,
            test.args.join(" "),
            status
        )));
    }
    if !stdout.contains(&test.expect) && !stderr.contains(&test.expect) {
        return Err(TapkitError::TestFailed(format!(
            "`{} {}` output did not contain \"{}\"",
            test.command,
            test.args.join(" "),
            test.expect
        )));
    }

    debug!("Smoke test passed for {}", command.display());
    Ok(SmokeTestReport {
        command,
        args: test.args.clone(),
        expect: test.expect.clone(),
        stdout,
        stderr,
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(reader: Option<JoinHandle<String>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use tapkit_common::formulary::builtin_formulae;

    use super::*;

    fn stub(keg: &Path, body: &str) {
        let bin = keg.join("bin");
        fs::create_dir_all(&bin).unwrap();
        let path = bin.join("docker_janitor");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn passes_when_help_mentions_usage() {
        let tmp = tempfile::tempdir().unwrap();
        stub(tmp.path(), r#"[ "$1" = "--help" ] && echo "Usage: docker_janitor [options]""#);
        let formula = builtin_formulae().remove(1);

        let report = run_smoke_test(&formula, tmp.path()).unwrap();
        assert!(report.stdout.starts_with("Usage:"));
        assert_eq!(report.args, vec!["--help".to_string()]);
    }

    #[test]
    fn usage_on_stderr_also_passes() {
        let tmp = tempfile::tempdir().unwrap();
        stub(tmp.path(), r#"echo "Usage: docker_janitor" >&2"#);
        let formula = builtin_formulae().remove(1);

        assert!(run_smoke_test(&formula, tmp.path()).is_ok());
    }

    #[test]
    fn fails_on_silent_binary() {
        let tmp = tempfile::tempdir().unwrap();
        stub(tmp.path(), "exit 0");
        let formula = builtin_formulae().remove(1);

        let err = run_smoke_test(&formula, tmp.path()).unwrap_err();
        assert!(matches!(err, TapkitError::TestFailed(msg) if msg.contains("Usage")));
    }

    #[test]
    fn fails_on_non_zero_exit_even_with_usage() {
        let tmp = tempfile::tempdir().unwrap();
        stub(tmp.path(), "echo Usage; exit 3");
        let formula = builtin_formulae().remove(1);

        assert!(matches!(
            run_smoke_test(&formula, tmp.path()),
            Err(TapkitError::TestFailed(_))
        ));
    }

    #[test]
    fn fails_when_binary_cannot_run() {
        let tmp = tempfile::tempdir().unwrap();
        let bin = tmp.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        // Not executable.
        fs::write(bin.join("docker_janitor"), "#!/bin/sh\necho Usage\n").unwrap();
        let formula = builtin_formulae().remove(1);

        assert!(matches!(
            run_smoke_test(&formula, tmp.path()),
            Err(TapkitError::CommandExecError(_))
        ));
    }

    #[test]
    fn hanging_command_is_killed_after_timeout() {
        let tmp = tempfile::tempdir().unwrap();
        stub(tmp.path(), "exec sleep 30");
        let mut test = SmokeTest::help("docker_janitor");
        test.timeout_secs = 1;

        let started = std::time::Instant::now();
        let err = run_test_command(&test, &tmp.path().join("bin")).unwrap_err();
        assert!(matches!(err, TapkitError::TestFailed(msg) if msg.contains("did not finish")));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn fails_when_not_installed() {
        let tmp = tempfile::tempdir().unwrap();
        let formula = builtin_formulae().remove(1);
        assert!(matches!(
            run_smoke_test(&formula, tmp.path()),
            Err(TapkitError::TestFailed(_))
        ));
    }
}
