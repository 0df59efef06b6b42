//! Error types for installation operations.
//!
//! Every variant carries an actionable `fix` so the CLI can print a
//! remediation next to the error.

use crate::process::{CommandOutput, ProcessError, StructuredCommand};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Maximum number of stderr lines kept in a [`InstallError::CommandFailed`].
const STDERR_TAIL_LINES: usize = 20;

/// Errors that abort an install method.
///
/// These never escape [`install`](crate::install()); they are folded into
/// [`InstallResult::error`](crate::InstallResult::error) and
/// [`InstallResult::remediation`](crate::InstallResult::remediation).
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum InstallError {
    /// The package manager is not installed or not on PATH.
    #[error("{program} not found on PATH")]
    PackageManagerMissing { program: String, fix: String },

    /// A step needed write access it does not have.
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String, fix: String },

    /// The package registry could not be reached.
    #[error("Network error: {message}")]
    Network {
        message: String,
        stderr: Option<String>,
        fix: String,
    },

    /// A package-manager command ran and failed.
    #[error("`{command}` failed with exit code {exit_code:?}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        /// Last lines of the command's standard error.
        stderr: String,
        fix: String,
    },

    /// A command outlived its time limit and was killed.
    #[error("`{command}` timed out after {duration:?}")]
    Timeout {
        command: String,
        duration: Duration,
        fix: String,
    },

    /// The installed package does not declare a usable executable.
    #[error("No entry point for {package} under {}", path.display())]
    EntryPointMissing {
        package: String,
        path: PathBuf,
        fix: String,
    },

    /// A regular file occupies the place the command link should go.
    #[error("{} exists and is not a symlink", path.display())]
    LinkBlocked { path: PathBuf, fix: String },

    /// The installed command did not run or did not report a version.
    #[error("Verification failed: {reason}")]
    VerificationFailed { reason: String, fix: String },

    /// No home directory could be determined.
    #[error("Could not determine the home directory")]
    HomeUnavailable { fix: String },

    /// A filesystem step failed.
    #[error("{context}: {message}")]
    Io {
        context: String,
        message: String,
        fix: String,
    },
}

impl InstallError {
    /// An actionable suggestion for fixing this error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rig_acp_installer::InstallError;
    /// use std::time::Duration;
    ///
    /// let error = InstallError::Timeout {
    ///     command: "npm install -g @openai/codex".to_string(),
    ///     duration: Duration::from_secs(300),
    ///     fix: "Check your network connection and try again".to_string(),
    /// };
    /// assert!(error.fix_suggestion().contains("network"));
    /// ```
    pub fn fix_suggestion(&self) -> &str {
        match self {
            Self::PackageManagerMissing { fix, .. }
            | Self::PermissionDenied { fix, .. }
            | Self::Network { fix, .. }
            | Self::CommandFailed { fix, .. }
            | Self::Timeout { fix, .. }
            | Self::EntryPointMissing { fix, .. }
            | Self::LinkBlocked { fix, .. }
            | Self::VerificationFailed { fix, .. }
            | Self::HomeUnavailable { fix }
            | Self::Io { fix, .. } => fix,
        }
    }

    /// A command that could not produce output at all.
    pub(crate) fn from_process(command: &StructuredCommand, err: ProcessError) -> Self {
        match err {
            ProcessError::NotFound { program } => Self::PackageManagerMissing {
                fix: format!("Install Node.js (which ships {program}) from https://nodejs.org and re-run"),
                program,
            },
            ProcessError::PermissionDenied { program } => Self::PermissionDenied {
                message: format!("cannot execute {program}"),
                fix: format!("Check the permissions of {program}"),
            },
            ProcessError::Timeout { after, .. } => Self::Timeout {
                command: command.to_string(),
                duration: after,
                fix: "Check your network connection and try again".to_string(),
            },
            ProcessError::Io { message, .. } => Self::Io {
                context: format!("running `{command}`"),
                message,
                fix: "Check the command and try again".to_string(),
            },
        }
    }

    /// A command that ran and exited non-zero, classified from its stderr.
    pub(crate) fn from_exit(command: &StructuredCommand, output: &CommandOutput) -> Self {
        let stderr = &output.stderr;

        if stderr.contains("EACCES") || stderr.contains("EPERM") {
            return Self::PermissionDenied {
                message: format!("`{command}` could not write to its install location"),
                fix: "Re-run with --method user-prefix or --method manual-local to install without elevated privileges"
                    .to_string(),
            };
        }

        let is_network = ["ENOTFOUND", "ETIMEDOUT", "ECONNREFUSED", "ECONNRESET", "network"]
            .iter()
            .any(|marker| stderr.contains(marker));
        if is_network {
            return Self::Network {
                message: format!("`{command}` could not reach the registry"),
                stderr: Some(stderr_tail(stderr)),
                fix: "Check your internet connection and npm registry settings, then try again"
                    .to_string(),
            };
        }

        Self::CommandFailed {
            command: command.to_string(),
            exit_code: output.exit_code,
            stderr: stderr_tail(stderr),
            fix: "See the package manager output above for details".to_string(),
        }
    }

    pub(crate) fn io(context: impl Into<String>, err: &std::io::Error) -> Self {
        let fix = if err.kind() == std::io::ErrorKind::PermissionDenied {
            "Check that your user owns the directory".to_string()
        } else {
            "Check free disk space and directory permissions".to_string()
        };
        Self::Io {
            context: context.into(),
            message: err.to_string(),
            fix,
        }
    }

    pub(crate) fn home_unavailable() -> Self {
        Self::HomeUnavailable {
            fix: "Set the HOME environment variable and try again".to_string(),
        }
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npm_install() -> StructuredCommand {
        StructuredCommand::new("npm", ["install", "-g", "@openai/codex"])
    }

    #[test]
    fn test_exit_with_eacces_is_permission_denied() {
        let output = CommandOutput::failed(243, "npm ERR! code EACCES\nnpm ERR! syscall mkdir");
        let error = InstallError::from_exit(&npm_install(), &output);
        assert!(matches!(error, InstallError::PermissionDenied { .. }));
        assert!(error.fix_suggestion().contains("manual-local"));
    }

    #[test]
    fn test_exit_with_enotfound_is_network() {
        let output = CommandOutput::failed(1, "npm ERR! code ENOTFOUND");
        let error = InstallError::from_exit(&npm_install(), &output);
        assert!(matches!(error, InstallError::Network { .. }));
    }

    #[test]
    fn test_other_exit_keeps_code_and_stderr_tail() {
        let stderr: String = (0..50).map(|i| format!("line {i}\n")).collect();
        let output = CommandOutput::failed(1, stderr);
        match InstallError::from_exit(&npm_install(), &output) {
            InstallError::CommandFailed {
                command,
                exit_code,
                stderr,
                ..
            } => {
                assert_eq!(command, "npm install -g @openai/codex");
                assert_eq!(exit_code, Some(1));
                assert_eq!(stderr.lines().count(), STDERR_TAIL_LINES);
                assert!(stderr.ends_with("line 49"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_process_not_found_is_missing_package_manager() {
        let error = InstallError::from_process(
            &npm_install(),
            ProcessError::NotFound { program: "npm".into() },
        );
        assert_eq!(error.to_string(), "npm not found on PATH");
        assert!(error.fix_suggestion().contains("nodejs.org"));
    }

    #[test]
    fn test_process_timeout_names_command() {
        let error = InstallError::from_process(
            &npm_install(),
            ProcessError::Timeout {
                program: "npm".into(),
                after: Duration::from_secs(300),
            },
        );
        assert!(error.to_string().contains("npm install -g @openai/codex"));
        assert!(error.to_string().contains("timed out"));
    }

    #[test]
    fn test_all_variants_have_fix() {
        let errors = vec![
            InstallError::home_unavailable(),
            InstallError::io(
                "creating /x",
                &std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            ),
            InstallError::LinkBlocked {
                path: PathBuf::from("/home/alice/.local/bin/claude"),
                fix: "Re-run with --force".into(),
            },
            InstallError::EntryPointMissing {
                package: "x".into(),
                path: PathBuf::from("/tmp/x"),
                fix: "Reinstall".into(),
            },
            InstallError::VerificationFailed {
                reason: "no version".into(),
                fix: "Restart the terminal".into(),
            },
        ];
        for error in errors {
            assert!(!error.fix_suggestion().is_empty(), "{error:?}");
        }
    }
}
