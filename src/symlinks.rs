//! Dangling command links left behind by earlier installs.

use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A stale link that could not be removed, with the command that would.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRemoval {
    /// The dangling link.
    pub path: PathBuf,
    /// Why unlinking it failed.
    pub error: String,
    /// e.g. `sudo rm /usr/local/bin/claude`
    pub remediation: String,
}

/// Outcome of a stale-link scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Dangling links that were unlinked.
    pub cleaned: Vec<PathBuf>,
    /// Dangling links that are still there.
    pub failed: Vec<FailedRemoval>,
}

impl ScanReport {
    /// One line per failed removal, for surfacing as warnings.
    pub fn warnings(&self) -> Vec<String> {
        self.failed
            .iter()
            .map(|f| {
                format!(
                    "Stale link {} could not be removed ({}); run: {}",
                    f.path.display(),
                    f.error,
                    f.remediation
                )
            })
            .collect()
    }
}

/// Remove every candidate that is a symlink whose target is gone.
///
/// Regular files, directories, missing paths and links with a live target
/// are left alone. Never escalates privileges: a removal that fails is
/// reported with the command to run by hand.
pub fn clean_stale_symlinks(candidates: &[PathBuf]) -> ScanReport {
    clean_stale_symlinks_with(candidates, |path| std::fs::remove_file(path))
}

/// [`clean_stale_symlinks`] with the unlink call supplied by the caller.
///
/// # Arguments
///
/// * `candidates` - Paths to inspect, typically `<bin dir>/<binary>` for
///   every system bin directory an earlier install may have used
/// * `remove` - Unlinks one stale link
///
/// # Returns
///
/// The links removed and, for each failed removal, the error and the
/// command that would remove it.
pub fn clean_stale_symlinks_with<F>(candidates: &[PathBuf], remove: F) -> ScanReport
where
    F: Fn(&Path) -> std::io::Result<()>,
{
    let mut report = ScanReport::default();

    for path in candidates {
        if !is_stale_symlink(path) {
            continue;
        }
        match remove(path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "removed stale symlink");
                report.cleaned.push(path.clone());
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not remove stale symlink");
                report.failed.push(FailedRemoval {
                    path: path.clone(),
                    error: e.to_string(),
                    remediation: remediation(path, e.kind()),
                });
            }
        }
    }

    report
}

/// `lstat` says symlink and `stat` says the target does not exist.
pub fn is_stale_symlink(path: &Path) -> bool {
    let Ok(meta) = std::fs::symlink_metadata(path) else {
        return false;
    };
    if !meta.file_type().is_symlink() {
        return false;
    }
    matches!(std::fs::metadata(path), Err(e) if e.kind() == ErrorKind::NotFound)
}

fn remediation(path: &Path, kind: ErrorKind) -> String {
    if kind == ErrorKind::PermissionDenied {
        format!("sudo rm {}", path.display())
    } else {
        format!("rm {}", path.display())
    }
}
