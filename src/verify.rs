//! Post-install verification: run the installed command and read its version.

use crate::detection::{find_executable, parse_version};
use crate::env::Environment;
use crate::install::InstallError;
use crate::process::{CommandRunner, ProcessError, StructuredCommand};
use semver::Version;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A command that ran and reported a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    /// The file that was executed.
    pub path: PathBuf,
    /// Version parsed from its `--version` output.
    pub version: Version,
}

/// Run `<binary> --version` and require a clean exit plus a semantic
/// version on stdout.
///
/// # Arguments
///
/// * `binary` - Command name, looked up on PATH only when `bin_path` is `None`
/// * `bin_path` - The file the install just produced; if given it must exist
/// * `limit` - Wall-clock limit; a timeout kills the process and fails
///
/// # Returns
///
/// The executed path and its version, or [`InstallError::VerificationFailed`].
pub async fn verify_installation(
    runner: &dyn CommandRunner,
    env: &dyn Environment,
    binary: &str,
    bin_path: Option<&Path>,
    limit: Duration,
) -> Result<Verified, InstallError> {
    let path = match bin_path {
        Some(path) if env.exists(path) => path.to_path_buf(),
        // Another copy on PATH would prove nothing about this install.
        Some(path) => {
            return Err(InstallError::VerificationFailed {
                reason: format!("{} does not exist after installation", path.display()),
                fix: "Reinstall with --force".to_string(),
            })
        }
        None => find_executable(env, binary).ok_or_else(|| InstallError::VerificationFailed {
            reason: format!("{binary} was not found on PATH"),
            fix: "Open a new terminal so PATH changes take effect, then run the installer again"
                .to_string(),
        })?,
    };

    let cmd = StructuredCommand::new(path.to_string_lossy(), ["--version"]);
    tracing::debug!(command = %cmd, "verifying installation");

    let output = runner.run(&cmd, limit).await.map_err(|e| {
        let reason = match &e {
            ProcessError::Timeout { after, .. } => format!("`{cmd}` did not finish within {after:?}"),
            other => other.to_string(),
        };
        InstallError::VerificationFailed {
            reason,
            fix: format!("Try running `{cmd}` yourself to see what is wrong"),
        }
    })?;

    if !output.success() {
        return Err(InstallError::VerificationFailed {
            reason: format!("`{cmd}` exited with code {:?}: {}", output.exit_code, output.stderr.trim()),
            fix: "Reinstall with --force".to_string(),
        });
    }

    let version = parse_version(&output.stdout).ok_or_else(|| InstallError::VerificationFailed {
        reason: format!("`{cmd}` printed no version: {}", output.stdout.trim()),
        fix: "Reinstall with --force".to_string(),
    })?;

    tracing::info!(path = %path.display(), %version, "installation verified");
    Ok(Verified { path, version })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnvironment;
    use crate::process::{CommandOutput, MockCommandRunner, SystemRunner};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_version_on_stdout_passes() {
        let dir = tempdir().unwrap();
        let bin = dir.path().join("claude");
        std::fs::write(&bin, "").unwrap();
        let env = MapEnvironment::new(dir.path());
        let mut runner = MockCommandRunner::new();
        let expected = bin.display().to_string();
        runner
            .expect_run()
            .withf(move |cmd, _| cmd.program == expected && cmd.args == ["--version"])
            .returning(|_, _| Ok(CommandOutput::ok("2.1.12 (Claude Code)\n")));

        let verified = verify_installation(&runner, &env, "claude", Some(&bin), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(verified.version, Version::new(2, 1, 12));
        assert_eq!(verified.path, bin);
    }

    #[tokio::test]
    async fn test_missing_binary_fails_without_running() {
        let dir = tempdir().unwrap();
        let env = MapEnvironment::new(dir.path()).with_var("PATH", dir.path().display().to_string());
        let runner = MockCommandRunner::new();

        let err = verify_installation(&runner, &env, "claude", None, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::VerificationFailed { .. }));
    }

    #[tokio::test]
    async fn test_output_without_version_fails() {
        let dir = tempdir().unwrap();
        let bin = dir.path().join("claude");
        std::fs::write(&bin, "").unwrap();
        let env = MapEnvironment::new(dir.path());
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_, _| Ok(CommandOutput::ok("Usage: claude [options]")));

        let err = verify_installation(&runner, &env, "claude", Some(&bin), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("printed no version"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails_even_with_version() {
        let dir = tempdir().unwrap();
        let bin = dir.path().join("claude");
        std::fs::write(&bin, "").unwrap();
        let env = MapEnvironment::new(dir.path());
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_, _| {
            Ok(CommandOutput {
                exit_code: Some(1),
                stdout: "1.0.0".into(),
                stderr: "Error: Cannot find module".into(),
            })
        });

        let err = verify_installation(&runner, &env, "claude", Some(&bin), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Cannot find module"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hanging_binary_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let bin = dir.path().join("hang");
        std::fs::write(&bin, "#!/bin/sh\nsleep 5\n").unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
        let env = MapEnvironment::new(dir.path());

        let err = verify_installation(&SystemRunner, &env, "hang", Some(&bin), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("did not finish"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_without_bin_path_looks_up_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let bin = dir.path().join("codex");
        std::fs::write(&bin, "#!/bin/sh\necho codex-cli 0.87.0\n").unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
        let env = MapEnvironment::new(dir.path()).with_var("PATH", dir.path().display().to_string());

        let verified = verify_installation(&SystemRunner, &env, "codex", None, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(verified.version, Version::new(0, 87, 0));
        assert_eq!(verified.path, bin);
    }

    #[tokio::test]
    async fn test_missing_bin_path_ignores_other_copy_on_path() {
        let dir = tempdir().unwrap();
        let older = dir.path().join("old-install");
        std::fs::create_dir_all(&older).unwrap();
        std::fs::write(older.join("claude"), "").unwrap();
        let env = MapEnvironment::new(dir.path()).with_var("PATH", older.display().to_string());
        // No expectations: running anything fails the test.
        let runner = MockCommandRunner::new();

        let err = verify_installation(
            &runner,
            &env,
            "claude",
            Some(&dir.path().join("usr/bin/claude")),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, InstallError::VerificationFailed { .. }));
        assert!(err.to_string().contains("does not exist"));
    }
}
