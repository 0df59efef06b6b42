//! The install pipeline.
//!
//! This module provides [`install`] and [`install_with_progress`], which run
//! detection, the chosen install method, PATH setup and verification in
//! order and fold every outcome into an [`InstallResult`].

use super::manual::install_manual;
use super::types::Installed;
use super::{InstallError, InstallMethod, InstallResult, InstallState};
use crate::detection::detect_install_method;
use crate::env::{Environment, RealEnvironment};
use crate::npm::{global_bin_dir, global_bin_path, global_package_dir, Npm};
use crate::options::{InstallLayout, InstallOptions, InstallerConfig};
use crate::prefix::configure_user_prefix;
use crate::process::{CommandRunner, SystemRunner};
use crate::shell::{remediation_for, resolve_profile, PathMutator, PathUpdateResult};
use crate::symlinks::clean_stale_symlinks;
use crate::verify::verify_installation;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Mutex;

/// Install the default tool on this machine without elevated privileges.
///
/// Never fails: every problem ends up in [`InstallResult::error`], with a
/// suggested fix in [`InstallResult::remediation`].
///
/// # Example
///
/// ```rust,no_run
/// use rig_acp_installer::{install, InstallOptions};
///
/// #[tokio::main]
/// async fn main() {
///     let result = install(InstallOptions::default()).await;
///     if result.success {
///         println!("Installed {:?} at {:?}", result.version, result.bin_path);
///     } else {
///         println!("Failed: {:?}. Fix: {:?}", result.error, result.remediation);
///     }
/// }
/// ```
pub async fn install(options: InstallOptions) -> InstallResult {
    install_with_progress(
        options,
        &InstallerConfig::default(),
        &RealEnvironment,
        &SystemRunner,
        |_| {},
    )
    .await
}

/// Install with explicit wiring, reporting each state transition to
/// `on_state`.
///
/// `on_state` sees `NotStarted` then `Detecting` first and exactly one of
/// `Succeeded` or `Failed` last. A panic in `on_state` fails the run like
/// any other panic. Calling this function is consent to install; confirming
/// with the operator is the caller's job.
pub async fn install_with_progress<F>(
    options: InstallOptions,
    config: &InstallerConfig,
    env: &dyn Environment,
    runner: &dyn CommandRunner,
    on_state: F,
) -> InstallResult
where
    F: Fn(InstallState) + Send + Sync,
{
    let method = Mutex::new(options.method_override.unwrap_or(InstallMethod::ManualLocal));
    let run = InstallRun {
        options: &options,
        config,
        env,
        runner,
        on_state: &on_state,
        method: &method,
    };

    match AssertUnwindSafe(run.execute()).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(%message, "install aborted by panic");
            if std::panic::catch_unwind(AssertUnwindSafe(|| on_state(InstallState::Failed))).is_err() {
                tracing::warn!("state callback panicked while reporting failure");
            }
            let method = match method.lock() {
                Ok(method) => *method,
                Err(poisoned) => *poisoned.into_inner(),
            };
            InstallResult {
                error: Some(format!("internal error: {message}")),
                ..InstallResult::started(method)
            }
        }
    }
}

struct InstallRun<'a> {
    options: &'a InstallOptions,
    config: &'a InstallerConfig,
    env: &'a dyn Environment,
    runner: &'a dyn CommandRunner,
    on_state: &'a (dyn Fn(InstallState) + Send + Sync),
    /// The method in effect, readable after a panic.
    method: &'a Mutex<InstallMethod>,
}

impl InstallRun<'_> {
    async fn execute(&self) -> InstallResult {
        let tool = &self.config.tool;
        let npm = Npm::new(self.runner, self.config.timeouts).verbose(self.options.verbose);

        self.transition(InstallState::NotStarted);
        self.transition(InstallState::Detecting);
        let method = match self.options.method_override {
            Some(method) => {
                tracing::debug!(%method, "install method overridden");
                method
            }
            None => detect_install_method(self.env, &npm).await,
        };
        if let Ok(mut slot) = self.method.lock() {
            *slot = method;
        }
        let mut result = InstallResult::started(method);

        let Some(home) = self.env.home_dir() else {
            return self.fail(result, InstallError::home_unavailable());
        };
        let layout = self.config.layout(&home);

        match npm.available_version(&tool.package).await {
            Ok(version) => tracing::info!(package = %tool.package, %version, "available version"),
            Err(e) => tracing::debug!(package = %tool.package, error = %e, "could not query available version"),
        }

        let mut candidates = layout.stale_candidates.clone();
        candidates.push(layout.local_link(&tool.binary));
        let scan = clean_stale_symlinks(&candidates);
        result.warnings.extend(scan.warnings());

        let mutator = PathMutator::new(self.env, &tool.display_name);

        self.transition(InstallState::Installing(method));
        let installed = match method {
            InstallMethod::UserPrefix => {
                self.install_user_prefix(&npm, &layout, &mutator, &mut result)
                    .await
            }
            InstallMethod::GlobalPrefix => self.install_global(&npm).await,
            InstallMethod::ManualLocal => {
                install_manual(&npm, tool, &layout, self.options.force).await
            }
        };
        let installed = match installed {
            Ok(installed) => installed,
            Err(e) => return self.fail(result, e),
        };
        result.installed_path = Some(installed.installed_path.clone());
        result.bin_path = Some(installed.bin_path.clone());

        self.transition(InstallState::PathUpdating);
        if self.options.skip_path_update {
            tracing::debug!("PATH update skipped");
            if !mutator.is_on_path(&installed.bin_dir) {
                result.remediation = Some(self.path_remediation(&installed.bin_dir));
            }
        } else {
            let update = mutator.ensure_on_path(&installed.bin_dir);
            self.record_path_update(&mut result, update, &installed.bin_dir);
        }

        self.transition(InstallState::Verifying);
        match verify_installation(
            self.runner,
            self.env,
            &tool.binary,
            Some(&installed.bin_path),
            self.config.timeouts.verify,
        )
        .await
        {
            Ok(verified) => {
                result.bin_path = Some(verified.path);
                result.version = Some(verified.version);
                result.success = true;
                self.transition(InstallState::Succeeded);
                result
            }
            Err(e) => self.fail(result, e),
        }
    }

    async fn install_user_prefix(
        &self,
        npm: &Npm<'_>,
        layout: &InstallLayout,
        mutator: &PathMutator<'_>,
        result: &mut InstallResult,
    ) -> Result<Installed, InstallError> {
        let mutator = (!self.options.skip_path_update).then_some(mutator);
        let configured = configure_user_prefix(npm, self.env, layout, mutator).await;
        if let Some(warning) = configured.warning {
            result.warnings.push(warning);
        }
        if let Some(update) = configured.path_update {
            if let Some(prefix) = &configured.prefix {
                self.record_path_update(result, update, &global_bin_dir(prefix));
            }
        }

        self.install_global(npm).await
    }

    async fn install_global(&self, npm: &Npm<'_>) -> Result<Installed, InstallError> {
        let tool = &self.config.tool;
        npm.install_global(&tool.package, self.options.force).await?;

        // Re-read: the prefix may have been reconfigured for this run.
        let prefix = npm.prefix().await?;
        Ok(Installed {
            installed_path: global_package_dir(&prefix, &tool.package),
            bin_dir: global_bin_dir(&prefix),
            bin_path: global_bin_path(&prefix, &tool.binary),
        })
    }

    fn record_path_update(&self, result: &mut InstallResult, update: PathUpdateResult, dir: &Path) {
        if update.path_added {
            result.path_updated = true;
            result.path_config_file = update.config_files.first().cloned();
        }
        if let Some(error) = update.error {
            tracing::warn!(%error, "PATH update failed");
            result.warnings.push(format!("Could not update PATH: {error}"));
            result.remediation = Some(self.path_remediation(dir));
        } else if let Some(warning) = update.warning {
            result.warnings.push(warning);
            result.remediation = Some(self.path_remediation(dir));
        }
    }

    fn path_remediation(&self, dir: &Path) -> String {
        remediation_for(resolve_profile(self.env).map(|p| p.shell), dir)
    }

    fn fail(&self, mut result: InstallResult, error: InstallError) -> InstallResult {
        tracing::warn!(%error, method = %result.method, "install failed");
        if let Some(path_fix) = result.remediation.take() {
            result.warnings.push(format!("Add the install directory to PATH: {path_fix}"));
        }
        result.success = false;
        result.remediation = Some(error.fix_suggestion().to_string());
        result.error = Some(error.to_string());
        self.transition(InstallState::Failed);
        result
    }

    fn transition(&self, state: InstallState) {
        tracing::info!(?state, "{}", state.description());
        (self.on_state)(state);
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
