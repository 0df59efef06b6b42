//! Install methods and the structured outcome of an install run.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How the package gets onto the machine without elevated privileges.
///
/// Chosen once per run and never persisted.
///
/// # Example
///
/// ```rust
/// use rig_acp_installer::InstallMethod;
///
/// let method: InstallMethod = "manual-local".parse().unwrap();
/// assert_eq!(method, InstallMethod::ManualLocal);
/// assert_eq!(InstallMethod::UserPrefix.to_string(), "user-prefix");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    strum::EnumString,
    strum::Display,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum InstallMethod {
    /// npm's prefix is (or is made to be) under the home directory.
    UserPrefix,
    /// npm's existing global prefix is writable by this user.
    GlobalPrefix,
    /// An isolated tree under `~/.local`, linked into `~/.local/bin`.
    ManualLocal,
}

/// Stages of an install run, in order.
///
/// `NotStarted → Detecting → Installing(method) → PathUpdating → Verifying →
/// Succeeded | Failed`. Any stage may jump to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    NotStarted,
    Detecting,
    Installing(InstallMethod),
    PathUpdating,
    Verifying,
    Succeeded,
    Failed,
}

impl InstallState {
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::Detecting => "Detecting install method",
            Self::Installing(InstallMethod::UserPrefix) => "Installing into user prefix",
            Self::Installing(InstallMethod::GlobalPrefix) => "Installing into global prefix",
            Self::Installing(InstallMethod::ManualLocal) => "Installing into local tree",
            Self::PathUpdating => "Updating PATH",
            Self::Verifying => "Verifying installation",
            Self::Succeeded => "Installation complete",
            Self::Failed => "Installation failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Everything an install run found out. Always returned, never an `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallResult {
    pub success: bool,
    pub method: InstallMethod,
    /// Where the package itself lives.
    pub installed_path: Option<PathBuf>,
    /// The command as the operator will invoke it.
    pub bin_path: Option<PathBuf>,
    /// Reported by the installed command; set only when verification passed.
    pub version: Option<Version>,
    /// A shell startup file was changed to expose the bin directory.
    pub path_updated: bool,
    pub path_config_file: Option<PathBuf>,
    pub error: Option<String>,
    /// A command or step the operator can take to fix what went wrong.
    pub remediation: Option<String>,
    /// Non-fatal problems (stale links, PATH setup, prefix configuration).
    pub warnings: Vec<String>,
}

impl InstallResult {
    pub(crate) fn started(method: InstallMethod) -> Self {
        Self {
            success: false,
            method,
            installed_path: None,
            bin_path: None,
            version: None,
            path_updated: false,
            path_config_file: None,
            error: None,
            remediation: None,
            warnings: vec![],
        }
    }
}

/// Locations produced by a successful install method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Installed {
    pub installed_path: PathBuf,
    pub bin_dir: PathBuf,
    pub bin_path: PathBuf,
}
