//! Unprivileged installation of an npm-distributed command.
//!
//! [`install`] picks one of three [`InstallMethod`]s, runs it, makes the
//! command reachable from new shells and then proves it works by running
//! it. The outcome is always an [`InstallResult`].
//!
//! # Example
//!
//! ```rust,no_run
//! use rig_acp_installer::{
//!     install_with_progress, InstallOptions, InstallerConfig, KnownTool,
//! };
//! use rig_acp_installer::env::RealEnvironment;
//! use rig_acp_installer::process::SystemRunner;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = InstallerConfig::for_tool(KnownTool::Codex.spec());
//!     let result = install_with_progress(
//!         InstallOptions::default(),
//!         &config,
//!         &RealEnvironment,
//!         &SystemRunner,
//!         |state| eprintln!("{}", state.description()),
//!     )
//!     .await;
//!     println!("success: {}", result.success);
//! }
//! ```

mod errors;
mod executor;
mod manual;
mod types;

pub use errors::InstallError;
pub use executor::{install, install_with_progress};
pub(crate) use executor::panic_message;
pub use types::{InstallMethod, InstallResult, InstallState};
