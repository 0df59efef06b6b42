//! PATH-based executable lookup.

use crate::env::Environment;
use std::path::PathBuf;

/// Find `name` on the PATH the environment reports.
pub(crate) fn find_executable(env: &dyn Environment, name: &str) -> Option<PathBuf> {
    let path = env.var("PATH")?;
    let cwd = env.home_dir().unwrap_or_else(|| PathBuf::from("/"));
    which::which_in(name, Some(path), cwd).ok()
}
