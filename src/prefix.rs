//! Point npm's global prefix at a directory the user owns.

use crate::detection::probe_write_access;
use crate::env::Environment;
use crate::npm::{global_bin_dir, Npm};
use crate::options::InstallLayout;
use crate::paths::is_path_under;
use crate::shell::{PathMutator, PathUpdateResult};
use std::path::{Path, PathBuf};

/// Outcome of [`configure_user_prefix`]. `success` is the only part callers
/// must look at; the rest is for reporting.
#[derive(Debug, Clone, Default)]
pub struct PrefixConfiguration {
    /// A user-owned prefix is in effect.
    pub success: bool,
    /// The prefix npm will use for the global install.
    pub prefix: Option<PathBuf>,
    /// Set when the prefix's bin directory was passed to the PATH mutator.
    pub path_update: Option<PathUpdateResult>,
    /// Why the prefix could not be configured; the install carries on.
    pub warning: Option<String>,
}

impl PrefixConfiguration {
    fn failed(warning: String) -> Self {
        tracing::warn!(%warning, "prefix configuration skipped");
        Self {
            warning: Some(warning),
            ..Self::default()
        }
    }
}

/// Make npm's global prefix user-owned and expose its bin directory.
///
/// A prefix that is already under home and writable is kept (nvm, fnm,
/// volta installs). Otherwise `layout.user_prefix` is created and npm is
/// pointed at it with `npm config set prefix`.
///
/// Best-effort: every failure is logged and reported as `success = false`,
/// and the caller goes on with whatever prefix is active.
///
/// # Arguments
///
/// * `layout` - Supplies the fallback prefix (`~/.npm-global`)
/// * `mutator` - When given, the prefix's bin directory is put on PATH
///
/// # Returns
///
/// The prefix in effect and, if a mutator was given, its PATH update.
pub async fn configure_user_prefix(
    npm: &Npm<'_>,
    env: &dyn Environment,
    layout: &InstallLayout,
    mutator: Option<&PathMutator<'_>>,
) -> PrefixConfiguration {
    let Some(home) = env.home_dir() else {
        return PrefixConfiguration::failed("no home directory for a user prefix".to_string());
    };

    let current = match npm.prefix().await {
        Ok(prefix) => Some(prefix),
        Err(e) => {
            tracing::debug!(error = %e, "could not read current prefix");
            None
        }
    };

    let prefix = match current.filter(|p| usable_user_prefix(p, &home)) {
        Some(prefix) => {
            tracing::debug!(prefix = %prefix.display(), "keeping user-owned prefix");
            prefix
        }
        None => {
            let target = layout.user_prefix.clone();
            if let Err(e) = std::fs::create_dir_all(global_bin_dir(&target)) {
                return PrefixConfiguration::failed(format!(
                    "could not create {}: {e}",
                    target.display()
                ));
            }
            if let Err(e) = npm.set_prefix(&target).await {
                return PrefixConfiguration::failed(format!(
                    "could not set npm prefix to {}: {e}",
                    target.display()
                ));
            }
            tracing::info!(prefix = %target.display(), "configured npm prefix");
            target
        }
    };

    let path_update = mutator.map(|m| m.ensure_on_path(&global_bin_dir(&prefix)));

    PrefixConfiguration {
        success: true,
        prefix: Some(prefix),
        path_update,
        warning: None,
    }
}

fn usable_user_prefix(prefix: &Path, home: &Path) -> bool {
    if !is_path_under(prefix, home) {
        return false;
    }
    let bin = global_bin_dir(prefix);
    // A fresh version-manager prefix may not have its bin directory yet.
    if let Err(e) = std::fs::create_dir_all(&bin) {
        tracing::debug!(dir = %bin.display(), error = %e, "cannot create prefix bin directory");
        return false;
    }
    probe_write_access(&bin)
}
