//! Environment accessor.
//!
//! Everything that would otherwise read `PATH`, `SHELL`, `HOME` or probe for
//! a file's existence goes through [`Environment`], so callers can run the
//! installer against a simulated environment.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

#[cfg_attr(test, mockall::automock)]
pub trait Environment: Send + Sync {
    /// Value of an environment variable, `None` if unset or not unicode.
    fn var(&self, key: &str) -> Option<String>;

    fn home_dir(&self) -> Option<PathBuf>;

    fn exists(&self, path: &Path) -> bool;
}

/// The live process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealEnvironment;

impl Environment for RealEnvironment {
    #[tracing::instrument(level = "trace", skip(self))]
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// An in-memory environment.
///
/// `exists` answers from the simulated set first and falls back to the real
/// filesystem, so fixtures under a temporary home behave naturally.
///
/// # Example
///
/// ```rust
/// use rig_acp_installer::env::{Environment, MapEnvironment};
///
/// let env = MapEnvironment::new("/home/alice")
///     .with_var("SHELL", "/bin/zsh")
///     .with_var("PATH", "/usr/bin:/bin");
/// assert_eq!(env.var("SHELL").as_deref(), Some("/bin/zsh"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapEnvironment {
    vars: HashMap<String, String>,
    home: Option<PathBuf>,
    existing: HashSet<PathBuf>,
}

impl MapEnvironment {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: Some(home.into()),
            ..Self::default()
        }
    }

    /// An environment with no resolvable home directory.
    pub fn homeless() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Mark a path as existing without creating it.
    pub fn with_existing(mut self, path: impl Into<PathBuf>) -> Self {
        self.existing.insert(path.into());
        self
    }
}

impl Environment for MapEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home.clone()
    }

    fn exists(&self, path: &Path) -> bool {
        self.existing.contains(path) || path.exists()
    }
}
