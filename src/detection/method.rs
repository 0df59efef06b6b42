//! Unprivileged install method selection.

use crate::env::Environment;
use crate::install::InstallMethod;
use crate::npm::{global_bin_dir, Npm};
use crate::paths::is_path_under;
use std::fs::OpenOptions;
use std::path::Path;

/// Choose how to install without elevated privileges.
///
/// 1. npm's prefix is under the home directory: [`InstallMethod::UserPrefix`]
/// 2. the global bin directory accepts a probe file: [`InstallMethod::GlobalPrefix`]
/// 3. otherwise: [`InstallMethod::ManualLocal`]
///
/// Never fails: an unreadable prefix or a failed probe counts as "no access".
pub async fn detect_install_method(env: &dyn Environment, npm: &Npm<'_>) -> InstallMethod {
    match npm.prefix().await {
        Ok(prefix) => classify_prefix(env, &prefix),
        Err(e) => {
            tracing::debug!(error = %e, "could not query npm prefix");
            InstallMethod::ManualLocal
        }
    }
}

/// Classify an already-known npm prefix.
pub fn classify_prefix(env: &dyn Environment, prefix: &Path) -> InstallMethod {
    if let Some(home) = env.home_dir() {
        if is_path_under(prefix, &home) {
            tracing::debug!(prefix = %prefix.display(), "prefix is under home");
            return InstallMethod::UserPrefix;
        }
    }

    let bin_dir = global_bin_dir(prefix);
    if probe_write_access(&bin_dir) {
        InstallMethod::GlobalPrefix
    } else {
        InstallMethod::ManualLocal
    }
}

/// Create and delete a sentinel file in `dir`.
///
/// `create_new` guarantees an existing file is never opened, let alone
/// truncated.
pub fn probe_write_access(dir: &Path) -> bool {
    let sentinel = dir.join(format!(".rig-acp-installer-probe-{}", std::process::id()));
    match OpenOptions::new().write(true).create_new(true).open(&sentinel) {
        Ok(file) => {
            drop(file);
            if let Err(e) = std::fs::remove_file(&sentinel) {
                tracing::warn!(path = %sentinel.display(), error = %e, "could not remove write probe");
            }
            tracing::debug!(dir = %dir.display(), "write probe succeeded");
            true
        }
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "write probe failed");
            false
        }
    }
}
