//! The manual-local method: an isolated npm tree plus one symlink.

use super::types::Installed;
use super::InstallError;
use crate::npm::{tree_package_dir, Npm};
use crate::options::InstallLayout;
use crate::ToolSpec;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// The part of `package.json` that names executables.
#[derive(Debug, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    bin: Option<BinField>,
}

/// `"bin": "cli.js"` or `"bin": { "claude": "cli.js" }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BinField {
    Single(String),
    Map(BTreeMap<String, String>),
}

/// Install `tool` into `layout.manual_tree` and link its executable into
/// `layout.local_bin`.
pub(crate) async fn install_manual(
    npm: &Npm<'_>,
    tool: &ToolSpec,
    layout: &InstallLayout,
    force: bool,
) -> Result<Installed, InstallError> {
    let tree = &layout.manual_tree;
    std::fs::create_dir_all(tree)
        .map_err(|e| InstallError::io(format!("creating {}", tree.display()), &e))?;
    std::fs::create_dir_all(&layout.local_bin)
        .map_err(|e| InstallError::io(format!("creating {}", layout.local_bin.display()), &e))?;

    npm.install_into(tree, &tool.package, force).await?;

    let package_dir = tree_package_dir(tree, &tool.package);
    let entry = entry_point(&package_dir, tool)?;
    let link = layout.local_link(&tool.binary);

    replace_link(&link, force)?;
    create_link(&entry, &link)
        .map_err(|e| InstallError::io(format!("linking {}", link.display()), &e))?;
    make_executable(&entry)
        .map_err(|e| InstallError::io(format!("marking {} executable", entry.display()), &e))?;

    tracing::info!(link = %link.display(), entry = %entry.display(), "linked command");
    Ok(Installed {
        installed_path: package_dir,
        bin_dir: layout.local_bin.clone(),
        bin_path: link,
    })
}

/// Resolve the file the command link should point at.
///
/// The `bin` entry named after the binary wins; a single unnamed entry is
/// accepted for packages whose binary name differs from the command.
fn entry_point(package_dir: &Path, tool: &ToolSpec) -> Result<PathBuf, InstallError> {
    let missing = |path: PathBuf| InstallError::EntryPointMissing {
        package: tool.package.clone(),
        path,
        fix: "Re-run with --force to reinstall the package".to_string(),
    };

    let manifest_path = package_dir.join("package.json");
    let raw = std::fs::read_to_string(&manifest_path).map_err(|_| missing(manifest_path.clone()))?;
    let manifest: PackageManifest =
        serde_json::from_str(&raw).map_err(|_| missing(manifest_path.clone()))?;

    let relative = match manifest.bin {
        Some(BinField::Single(path)) => Some(path),
        Some(BinField::Map(mut entries)) => match entries.remove(&tool.binary) {
            Some(path) => Some(path),
            None if entries.len() == 1 => entries.into_values().next(),
            None => None,
        },
        None => None,
    }
    .ok_or_else(|| missing(manifest_path.clone()))?;

    let entry = package_dir.join(relative);
    if !entry.is_file() {
        return Err(missing(entry));
    }
    Ok(entry)
}

/// Clear the way for the command link.
///
/// An existing symlink is always replaced. A regular file is only replaced
/// with `force`; a directory never is.
fn replace_link(link: &Path, force: bool) -> Result<(), InstallError> {
    let meta = match std::fs::symlink_metadata(link) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(InstallError::io(format!("inspecting {}", link.display()), &e)),
    };

    let file_type = meta.file_type();
    if file_type.is_dir() || (file_type.is_file() && !force) {
        return Err(InstallError::LinkBlocked {
            path: link.to_path_buf(),
            fix: if file_type.is_dir() {
                format!("Move {} out of the way and re-run", link.display())
            } else {
                "Re-run with --force to replace it".to_string()
            },
        });
    }

    tracing::debug!(path = %link.display(), "removing existing command link");
    std::fs::remove_file(link)
        .map_err(|e| InstallError::io(format!("removing {}", link.display()), &e))
}

#[cfg(unix)]
fn create_link(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_link(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o111);
    std::fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
