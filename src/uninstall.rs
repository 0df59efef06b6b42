//! Best-effort removal of everything an install left behind.

use crate::env::{Environment, RealEnvironment};
use crate::install::panic_message;
use crate::npm::{global_bin_path, global_package_dir, Npm};
use crate::options::{InstallLayout, InstallerConfig};
use crate::process::{CommandRunner, SystemRunner};
use crate::shell::PathMutator;
use crate::symlinks::clean_stale_symlinks;
use futures::FutureExt;
use serde::Serialize;
use std::io::ErrorKind;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

/// What [`uninstall`] did.
///
/// `success` stays `true` through any number of failed cleanup steps; those
/// are listed in `failures`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UninstallReport {
    /// `false` only when the uninstall aborted unexpectedly.
    pub success: bool,
    /// What aborted it.
    pub error: Option<String>,
    /// `npm uninstall -g` exited cleanly.
    pub npm_uninstalled: bool,
    /// Files, directories and links deleted.
    pub removed: Vec<PathBuf>,
    /// Startup files the PATH guard block was stripped from.
    pub profiles_cleaned: Vec<PathBuf>,
    /// One message per step that did not complete.
    pub failures: Vec<String>,
}

/// Uninstall the default tool from this machine.
pub async fn uninstall() -> UninstallReport {
    uninstall_with(&InstallerConfig::default(), &RealEnvironment, &SystemRunner).await
}

/// Uninstall with explicit wiring.
///
/// Runs `npm uninstall -g` first. The manual-local tree and link are always
/// removed since npm does not know about them. If npm fails, every other
/// artifact is cleaned by hand: the user-prefix package, PATH guard blocks,
/// config and cache directories, and dangling links in system bin
/// directories. No failure stops the remaining steps.
pub async fn uninstall_with(
    config: &InstallerConfig,
    env: &dyn Environment,
    runner: &dyn CommandRunner,
) -> UninstallReport {
    match AssertUnwindSafe(run_uninstall(config, env, runner))
        .catch_unwind()
        .await
    {
        Ok(report) => report,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(%message, "uninstall aborted by panic");
            UninstallReport {
                success: false,
                error: Some(format!("internal error: {message}")),
                ..UninstallReport::default()
            }
        }
    }
}

async fn run_uninstall(
    config: &InstallerConfig,
    env: &dyn Environment,
    runner: &dyn CommandRunner,
) -> UninstallReport {
    let tool = &config.tool;
    let mut report = UninstallReport {
        success: true,
        ..UninstallReport::default()
    };

    let npm = Npm::new(runner, config.timeouts);
    match npm.uninstall_global(&tool.package).await {
        Ok(()) => {
            tracing::info!(package = %tool.package, "npm uninstall succeeded");
            report.npm_uninstalled = true;
        }
        Err(e) => {
            tracing::warn!(package = %tool.package, error = %e, "npm uninstall failed, cleaning up manually");
            report.failures.push(e.to_string());
        }
    }

    let Some(home) = env.home_dir() else {
        report
            .failures
            .push("no home directory; skipped local cleanup".to_string());
        return report;
    };
    let layout = config.layout(&home);
    let local_link = layout.local_link(&tool.binary);

    remove_link(&local_link, &mut report);
    remove_path(&layout.manual_tree, &mut report);

    if report.npm_uninstalled {
        return report;
    }

    remove_path(&global_package_dir(&layout.user_prefix, &tool.package), &mut report);
    remove_link(&global_bin_path(&layout.user_prefix, &tool.binary), &mut report);

    let (cleaned, failures) = PathMutator::new(env, &tool.display_name).remove_guard_blocks();
    report.profiles_cleaned = cleaned;
    report.failures.extend(failures);

    remove_path(&layout.config_dir, &mut report);
    remove_path(&layout.cache_dir, &mut report);

    clean_system_links(&layout, &mut report);

    report
}

fn clean_system_links(layout: &InstallLayout, report: &mut UninstallReport) {
    let scan = clean_stale_symlinks(&layout.stale_candidates);
    report.removed.extend(scan.cleaned.iter().cloned());
    report.failures.extend(scan.warnings());
}

/// Remove `path` if it is a symlink. Anything else at that path is not ours.
fn remove_link(path: &Path, report: &mut UninstallReport) {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => remove_path(path, report),
        Ok(_) => {
            tracing::debug!(path = %path.display(), "not a symlink, leaving it");
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => report.failures.push(format!("inspecting {}: {e}", path.display())),
    }
}

fn remove_path(path: &Path, report: &mut UninstallReport) {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return,
        Err(e) => {
            report.failures.push(format!("inspecting {}: {e}", path.display()));
            return;
        }
    };

    let removed = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match removed {
        Ok(()) => {
            tracing::info!(path = %path.display(), "removed");
            report.removed.push(path.to_path_buf());
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not remove");
            report.failures.push(format!("removing {}: {e}", path.display()));
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::env::MapEnvironment;
    use crate::npm::tree_package_dir;
    use crate::process::{CommandOutput, MockCommandRunner};
    use std::os::unix::fs::symlink;
    use tempfile::tempdir;

    fn config_for(home: &Path) -> InstallerConfig {
        let mut layout = InstallLayout::for_home(home, "claude");
        layout.stale_candidates = vec![];
        InstallerConfig {
            layout_override: Some(layout),
            ..InstallerConfig::default()
        }
    }

    fn npm_uninstall(exit: Option<i32>) -> MockCommandRunner {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd, _| cmd.args == ["uninstall", "-g", "@anthropic-ai/claude-code"])
            .times(1)
            .returning(move |_, _| match exit {
                None => Ok(CommandOutput::ok("removed 1 package")),
                Some(code) => Ok(CommandOutput::failed(code, "npm ERR! code EACCES")),
            });
        runner
    }

    /// Lay out a manual-local install with a PATH guard block in `.bashrc`.
    fn installed_manually(home: &Path, layout: &InstallLayout) {
        let package = tree_package_dir(&layout.manual_tree, "@anthropic-ai/claude-code");
        std::fs::create_dir_all(&package).unwrap();
        std::fs::write(package.join("cli.js"), "").unwrap();
        std::fs::create_dir_all(&layout.local_bin).unwrap();
        symlink(package.join("cli.js"), layout.local_link("claude")).unwrap();
        std::fs::create_dir_all(&layout.config_dir).unwrap();
        std::fs::write(
            home.join(".bashrc"),
            format!(
                "alias ll='ls -l'\n\n# Claude Code PATH configuration\nexport PATH=\"{}:$PATH\"\n# End Claude Code PATH configuration\n",
                layout.local_bin.display()
            ),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_npm_failure_falls_back_to_full_cleanup() {
        let home = tempdir().unwrap();
        let config = config_for(home.path());
        let layout = config.layout(home.path());
        installed_manually(home.path(), &layout);
        let env = MapEnvironment::new(home.path()).with_var("SHELL", "/bin/bash");

        let report = uninstall_with(&config, &env, &npm_uninstall(Some(243))).await;

        assert!(report.success);
        assert!(!report.npm_uninstalled);
        assert!(!layout.manual_tree.exists());
        assert!(std::fs::symlink_metadata(layout.local_link("claude")).is_err());
        assert!(!layout.config_dir.exists());
        assert_eq!(report.profiles_cleaned, vec![home.path().join(".bashrc")]);
        assert_eq!(
            std::fs::read_to_string(home.path().join(".bashrc")).unwrap(),
            "alias ll='ls -l'\n"
        );
    }

    #[tokio::test]
    async fn test_npm_success_keeps_path_configuration() {
        let home = tempdir().unwrap();
        let config = config_for(home.path());
        let layout = config.layout(home.path());
        installed_manually(home.path(), &layout);
        let env = MapEnvironment::new(home.path());

        let report = uninstall_with(&config, &env, &npm_uninstall(None)).await;

        assert!(report.success);
        assert!(report.npm_uninstalled);
        assert!(!layout.manual_tree.exists());
        assert!(report.profiles_cleaned.is_empty());
        assert!(layout.config_dir.exists());
        let bashrc = std::fs::read_to_string(home.path().join(".bashrc")).unwrap();
        assert!(bashrc.contains("# Claude Code PATH configuration"));
    }

    #[tokio::test]
    async fn test_regular_file_at_link_location_is_left_alone() {
        let home = tempdir().unwrap();
        let config = config_for(home.path());
        let layout = config.layout(home.path());
        std::fs::create_dir_all(&layout.local_bin).unwrap();
        std::fs::write(layout.local_link("claude"), "not ours").unwrap();

        let report = uninstall_with(&config, &MapEnvironment::new(home.path()), &npm_uninstall(None)).await;

        assert!(report.success);
        assert!(layout.local_link("claude").exists());
    }

    #[tokio::test]
    async fn test_every_step_failing_still_reports_success() {
        let home = tempdir().unwrap();
        // Paths nested under a regular file fail with ENOTDIR, even for root.
        let blocker = home.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let layout = InstallLayout {
            user_prefix: blocker.join("npm-global"),
            manual_tree: blocker.join("lib/claude"),
            local_bin: blocker.join("bin"),
            config_dir: blocker.join("config"),
            cache_dir: blocker.join("cache"),
            stale_candidates: vec![blocker.join("usr/bin/claude")],
        };
        let config = InstallerConfig {
            layout_override: Some(layout),
            ..InstallerConfig::default()
        };
        // A directory where a startup file should be cannot be read.
        std::fs::create_dir_all(home.path().join(".zshrc")).unwrap();

        let report = uninstall_with(
            &config,
            &MapEnvironment::new(home.path()),
            &npm_uninstall(Some(1)),
        )
        .await;

        assert!(report.success);
        assert!(report.error.is_none());
        assert!(report.removed.is_empty());
        // npm, tree, link, prefix package, prefix link, .zshrc, config, cache
        assert!(report.failures.len() >= 7, "{:?}", report.failures);
    }

    #[tokio::test]
    async fn test_panic_is_the_only_unsuccessful_outcome() {
        struct ExplodingRunner;

        #[async_trait::async_trait]
        impl CommandRunner for ExplodingRunner {
            async fn run(
                &self,
                _command: &crate::process::StructuredCommand,
                _limit: std::time::Duration,
            ) -> Result<CommandOutput, crate::process::ProcessError> {
                panic!("npm exploded")
            }
        }

        let home = tempdir().unwrap();
        let report = uninstall_with(
            &config_for(home.path()),
            &MapEnvironment::new(home.path()),
            &ExplodingRunner,
        )
        .await;

        assert!(!report.success);
        assert!(report.error.unwrap().contains("npm exploded"));
    }
}
