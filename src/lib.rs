//! # rig-acp-installer
//!
//! Unprivileged installer for npm-distributed AI coding agents (Claude Code,
//! Codex, OpenCode, Gemini).
//!
//! Installs the agent's npm package without `sudo`, makes its command
//! reachable from new shells through a guard block in the shell startup
//! file, and proves the install by running the command. Uninstall reverses
//! all of it, best-effort.
//!
//! ## Features
//!
//! - [`install`] / [`install_with_progress`]: detect an install method, run
//!   it, update PATH, verify. Always returns an [`InstallResult`].
//! - [`uninstall`] / [`uninstall_with`]: npm uninstall with manual fallback.
//!   Always returns an [`UninstallReport`].
//! - Every component ([`shell`], [`detection`], [`symlinks`], [`verify`],
//!   [`prefix`]) is usable on its own against a simulated [`env::Environment`]
//!   and a scripted [`process::CommandRunner`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use rig_acp_installer::{install, uninstall, InstallOptions};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let result = install(InstallOptions::default()).await;
//!     if !result.success {
//!         eprintln!("{}", result.error.unwrap_or_default());
//!         if let Some(fix) = result.remediation {
//!             eprintln!("To fix: {fix}");
//!         }
//!     }
//!
//!     let report = uninstall().await;
//!     assert!(report.success);
//! }
//! ```

pub mod detection;
pub mod env;
mod install;
pub mod npm;
mod options;
pub mod paths;
pub mod prefix;
pub mod process;
pub mod shell;
pub mod symlinks;
mod tool;
mod uninstall;
pub mod verify;

pub use install::{
    install, install_with_progress, InstallError, InstallMethod, InstallResult, InstallState,
};
pub use options::{InstallLayout, InstallOptions, InstallerConfig, Timeouts};
pub use tool::{KnownTool, ToolSpec};
pub use uninstall::{uninstall, uninstall_with, UninstallReport};
