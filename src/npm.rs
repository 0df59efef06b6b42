//! The host package manager (npm), driven as a subprocess.
//!
//! The argv built here is a contract with npm and must stay exact:
//!
//! | purpose | command |
//! |---|---|
//! | query prefix | `npm config get prefix` |
//! | set prefix | `npm config set prefix <dir>` |
//! | global install | `npm install -g <package>` |
//! | tree install | `npm install --prefix <tree> <package>` |
//! | available version | `npm view <package> version` |
//! | global uninstall | `npm uninstall -g <package>` |

use crate::detection::parse_version;
use crate::install::InstallError;
use crate::options::Timeouts;
use crate::process::{CommandOutput, CommandRunner, StructuredCommand};
use semver::Version;
use std::path::{Path, PathBuf};

const NPM: &str = "npm";

/// npm bound to a runner and its time limits.
pub struct Npm<'a> {
    runner: &'a dyn CommandRunner,
    timeouts: Timeouts,
    verbose: bool,
}

impl<'a> Npm<'a> {
    pub fn new(runner: &'a dyn CommandRunner, timeouts: Timeouts) -> Self {
        Self {
            runner,
            timeouts,
            verbose: false,
        }
    }

    /// Log command output at `info` rather than `debug`.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// `npm config get prefix`
    pub async fn prefix(&self) -> Result<PathBuf, InstallError> {
        let cmd = StructuredCommand::new(NPM, ["config", "get", "prefix"]);
        let output = self.run_checked(&cmd, self.timeouts.query).await?;
        let prefix = output.stdout.trim();
        if prefix.is_empty() {
            return Err(InstallError::CommandFailed {
                command: cmd.to_string(),
                exit_code: output.exit_code,
                stderr: "empty prefix".to_string(),
                fix: "Run `npm config get prefix` and check your .npmrc".to_string(),
            });
        }
        Ok(PathBuf::from(prefix))
    }

    /// `npm config set prefix <dir>`
    pub async fn set_prefix(&self, dir: &Path) -> Result<(), InstallError> {
        let cmd = StructuredCommand::new(NPM, ["config", "set", "prefix"])
            .arg(dir.to_string_lossy());
        self.run_checked(&cmd, self.timeouts.query).await.map(drop)
    }

    /// `npm install -g <package>`
    pub async fn install_global(&self, package: &str, force: bool) -> Result<(), InstallError> {
        let mut cmd = StructuredCommand::new(NPM, ["install", "-g"]).arg(package);
        if force {
            cmd = cmd.arg("--force");
        }
        self.run_checked(&cmd, self.timeouts.install).await.map(drop)
    }

    /// `npm install --prefix <tree> <package>`
    pub async fn install_into(
        &self,
        tree: &Path,
        package: &str,
        force: bool,
    ) -> Result<(), InstallError> {
        let mut cmd = StructuredCommand::new(NPM, ["install", "--prefix"])
            .arg(tree.to_string_lossy())
            .arg(package);
        if force {
            cmd = cmd.arg("--force");
        }
        self.run_checked(&cmd, self.timeouts.install).await.map(drop)
    }

    /// `npm uninstall -g <package>`
    pub async fn uninstall_global(&self, package: &str) -> Result<(), InstallError> {
        let cmd = StructuredCommand::new(NPM, ["uninstall", "-g"]).arg(package);
        self.run_checked(&cmd, self.timeouts.install).await.map(drop)
    }

    /// `npm view <package> version`, the newest published version.
    pub async fn available_version(&self, package: &str) -> Result<Version, InstallError> {
        let cmd = StructuredCommand::new(NPM, ["view"]).arg(package).arg("version");
        let output = self.run_checked(&cmd, self.timeouts.query).await?;
        parse_version(&output.stdout).ok_or_else(|| InstallError::CommandFailed {
            command: cmd.to_string(),
            exit_code: output.exit_code,
            stderr: format!("unexpected output: {}", output.stdout.trim()),
            fix: format!("Check that {package} exists on the npm registry"),
        })
    }

    async fn run_checked(
        &self,
        cmd: &StructuredCommand,
        limit: std::time::Duration,
    ) -> Result<CommandOutput, InstallError> {
        let output = self
            .runner
            .run(cmd, limit)
            .await
            .map_err(|e| InstallError::from_process(cmd, e))?;

        if self.verbose {
            tracing::info!(command = %cmd, stdout = %output.stdout.trim(), stderr = %output.stderr.trim(), "npm output");
        } else {
            tracing::debug!(command = %cmd, stdout = %output.stdout.trim(), stderr = %output.stderr.trim(), "npm output");
        }

        if !output.success() {
            return Err(InstallError::from_exit(cmd, &output));
        }
        Ok(output)
    }
}

/// Directory npm links global executables into for `prefix`.
pub fn global_bin_dir(prefix: &Path) -> PathBuf {
    if cfg!(windows) {
        prefix.to_path_buf()
    } else {
        prefix.join("bin")
    }
}

/// The command npm links for `binary` under `prefix`.
pub fn global_bin_path(prefix: &Path, binary: &str) -> PathBuf {
    if cfg!(windows) {
        prefix.join(format!("{binary}.cmd"))
    } else {
        global_bin_dir(prefix).join(binary)
    }
}

/// Directory a global install of `package` lands in for `prefix`.
pub fn global_package_dir(prefix: &Path, package: &str) -> PathBuf {
    if cfg!(windows) {
        prefix.join("node_modules").join(package)
    } else {
        prefix.join("lib").join("node_modules").join(package)
    }
}

/// Directory `npm install --prefix <tree>` puts `package` in.
pub fn tree_package_dir(tree: &Path, package: &str) -> PathBuf {
    tree.join("node_modules").join(package)
}
