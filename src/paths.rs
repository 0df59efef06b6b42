//! Lexical path comparison helpers.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by processing `.` and `..` components lexically.
/// Does not touch the filesystem and does not follow symlinks.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push(component);
                }
            }
            _ => result.push(component),
        }
    }
    result
}

/// True if `path` is `dir` or lies below it, compared component by component.
///
/// `/home/alice2` is not under `/home/alice`, and
/// `/home/alice/../bob` is not under `/home/alice`.
pub fn is_path_under(path: &Path, dir: &Path) -> bool {
    normalize_path(path).starts_with(normalize_path(dir))
}

/// Same directory after lexical normalization (trailing slashes and `.`
/// segments ignored).
pub fn same_dir(a: &Path, b: &Path) -> bool {
    normalize_path(a) == normalize_path(b)
}

/// Expand a leading `~` or `$HOME` against `home`.
pub(crate) fn expand_home(raw: &str, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return PathBuf::from(raw);
    };
    for prefix in ["~", "$HOME", "${HOME}"] {
        if raw == prefix {
            return home.to_path_buf();
        }
        if let Some(rest) = raw.strip_prefix(prefix).and_then(|r| r.strip_prefix('/')) {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}
