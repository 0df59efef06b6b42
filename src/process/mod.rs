//! Bounded subprocess execution.
//!
//! Every external command the installer starts (npm queries, the install
//! itself, the version probe) goes through [`run_bounded`]: output is
//! collected under a fixed time limit, and on expiry the child is
//! force-killed before the timeout is reported.
//!
//! Orchestration code depends on the [`CommandRunner`] trait rather than on
//! [`run_bounded`] directly so the package manager can be scripted in tests.

mod command;
mod errors;
mod runner;

pub use command::{CommandOutput, StructuredCommand};
pub use errors::ProcessError;
pub use runner::{run_bounded, CommandRunner, SystemRunner};
#[cfg(test)]
pub use runner::MockCommandRunner;
