//! Installer configuration.
//!
//! [`InstallOptions`] is what the caller decides per run; [`InstallerConfig`]
//! is how the installer is wired (which tool, how long each subprocess may
//! take, where things live). Both have sensible defaults.

use crate::install::InstallMethod;
use crate::ToolSpec;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Caller-supplied options for a single install run.
///
/// # Example
///
/// ```rust
/// use rig_acp_installer::{InstallMethod, InstallOptions};
///
/// let opts = InstallOptions {
///     skip_path_update: true,
///     method_override: Some(InstallMethod::ManualLocal),
///     ..Default::default()
/// };
/// assert!(!opts.force);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Log package-manager output at `info` instead of `debug`.
    pub verbose: bool,

    /// Pass `--force` to npm and replace a regular file sitting where the
    /// manual-install symlink goes.
    pub force: bool,

    /// Never touch shell startup files.
    pub skip_path_update: bool,

    /// Use this method instead of detecting one.
    pub method_override: Option<InstallMethod>,
}

/// Fixed upper bounds for every subprocess the installer starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// `npm config get/set`, `npm view`.
    ///
    /// Default: 30 seconds
    pub query: Duration,

    /// `npm install` / `npm uninstall`.
    ///
    /// Default: 5 minutes
    pub install: Duration,

    /// `<binary> --version`.
    ///
    /// Default: 10 seconds
    pub verify: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            query: Duration::from_secs(30),
            install: Duration::from_secs(300),
            verify: Duration::from_secs(10),
        }
    }
}

/// Every durable location the installer creates, links or scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    /// User-owned npm prefix set by the prefix configurator.
    pub user_prefix: PathBuf,
    /// Isolated tree used by the manual install method.
    pub manual_tree: PathBuf,
    /// Directory holding the manual install's symlink.
    pub local_bin: PathBuf,
    /// The tool's own settings directory, removed on uninstall.
    pub config_dir: PathBuf,
    /// The tool's cache directory, removed on uninstall.
    pub cache_dir: PathBuf,
    /// System locations that earlier installs may have left dangling links in.
    pub stale_candidates: Vec<PathBuf>,
}

/// System bin directories scanned for dangling links.
const SYSTEM_BIN_DIRS: &[&str] = &["/usr/local/bin", "/usr/bin", "/opt/homebrew/bin"];

impl InstallLayout {
    pub fn for_home(home: &Path, binary: &str) -> Self {
        Self {
            user_prefix: home.join(".npm-global"),
            manual_tree: home.join(".local").join("lib").join(binary),
            local_bin: home.join(".local").join("bin"),
            config_dir: home.join(".config").join(binary),
            cache_dir: home.join(".cache").join(binary),
            stale_candidates: SYSTEM_BIN_DIRS
                .iter()
                .map(|dir| Path::new(dir).join(binary))
                .collect(),
        }
    }

    /// Where the manual install's symlink lives.
    pub fn local_link(&self, binary: &str) -> PathBuf {
        self.local_bin.join(binary)
    }
}

/// How the installer is wired.
#[derive(Debug, Clone, Default)]
pub struct InstallerConfig {
    /// What to install.
    pub tool: ToolSpec,
    /// Limits for every subprocess the installer runs.
    pub timeouts: Timeouts,
    /// Replaces the home-derived [`InstallLayout`] when set.
    pub layout_override: Option<InstallLayout>,
}

impl InstallerConfig {
    pub fn for_tool(tool: ToolSpec) -> Self {
        Self {
            tool,
            ..Self::default()
        }
    }

    /// The layout to use, given the resolved home directory.
    pub fn layout(&self, home: &Path) -> InstallLayout {
        self.layout_override
            .clone()
            .unwrap_or_else(|| InstallLayout::for_home(home, &self.tool.binary))
    }
}
