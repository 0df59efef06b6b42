//! Idempotent PATH setup through the shell startup file.

use super::guard::{append_block, GuardBlock, GuardMarkers};
use super::{candidate_profiles, remediation_for, resolve_profile, ShellKind};
use crate::env::Environment;
use crate::paths::{expand_home, is_path_under, same_dir};
use regex::Regex;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Outcome of [`PathMutator::ensure_on_path`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PathUpdateResult {
    pub success: bool,
    /// A startup file now adds the directory where it did not before.
    pub path_added: bool,
    pub config_files: Vec<PathBuf>,
    /// The startup file changed; running shells must re-source it.
    pub needs_reload: bool,
    pub error: Option<String>,
    /// Set when nothing was done for a reason the operator should know about.
    pub warning: Option<String>,
}

impl PathUpdateResult {
    fn unchanged() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    fn failed(config_file: PathBuf, error: String) -> Self {
        Self {
            success: false,
            config_files: vec![config_file],
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Edits shell startup files on behalf of one tool.
pub struct PathMutator<'a> {
    env: &'a dyn Environment,
    markers: GuardMarkers,
}

impl<'a> PathMutator<'a> {
    pub fn new(env: &'a dyn Environment, tool_display_name: &str) -> Self {
        Self {
            env,
            markers: GuardMarkers::for_tool(tool_display_name),
        }
    }

    /// Make `dir` reachable from new shells.
    ///
    /// Stops at the first of:
    /// 1. `dir` is already on the process PATH
    /// 2. the startup file already puts `dir` on PATH
    /// 3. the startup file is rewritten with `dir` in the guard block
    ///
    /// Calling this twice with the same `dir` leaves the file byte-identical
    /// after the second call.
    pub fn ensure_on_path(&self, dir: &Path) -> PathUpdateResult {
        if self.is_on_path(dir) {
            tracing::debug!(dir = %dir.display(), "already on PATH");
            return PathUpdateResult::unchanged();
        }

        let Some(profile) = resolve_profile(self.env) else {
            let shell = self.env.var("SHELL").unwrap_or_else(|| "unknown".to_string());
            tracing::warn!(%shell, "unrecognized shell, not editing any startup file");
            return PathUpdateResult {
                warning: Some(format!(
                    "Unrecognized shell '{shell}'; add {} to your PATH manually: {}",
                    dir.display(),
                    remediation_for(None, dir)
                )),
                ..PathUpdateResult::unchanged()
            };
        };
        let file = profile.config_file;

        let content = match std::fs::read_to_string(&file) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => {
                return PathUpdateResult::failed(file.clone(), format!("reading {}: {e}", file.display()))
            }
        };

        if self.profile_adds(&content, profile.shell, dir) {
            tracing::debug!(file = %file.display(), "startup file already adds directory");
            return PathUpdateResult {
                config_files: vec![file],
                ..PathUpdateResult::unchanged()
            };
        }

        let line = profile.shell.path_line(dir);
        let updated = match GuardBlock::parse(&content, &self.markers) {
            Some(mut block) => {
                block.upsert(dir, line);
                block.render(&self.markers)
            }
            None => append_block(&content, &self.markers, line),
        };

        if updated == content {
            return PathUpdateResult {
                config_files: vec![file],
                ..PathUpdateResult::unchanged()
            };
        }

        if let Err(e) = write_profile(&file, &updated) {
            return PathUpdateResult::failed(file.clone(), format!("writing {}: {e}", file.display()));
        }

        tracing::info!(file = %file.display(), dir = %dir.display(), "added directory to PATH");
        PathUpdateResult {
            success: true,
            path_added: true,
            config_files: vec![file],
            needs_reload: true,
            error: None,
            warning: None,
        }
    }

    /// Remove the guard block from every startup file that has one.
    ///
    /// Returns the cleaned files and a message per file that could not be
    /// cleaned. A failure on one file does not stop the others.
    pub fn remove_guard_blocks(&self) -> (Vec<PathBuf>, Vec<String>) {
        let mut cleaned = Vec::new();
        let mut failures = Vec::new();

        for file in candidate_profiles(self.env) {
            let content = match std::fs::read_to_string(&file) {
                Ok(content) => content,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    failures.push(format!("reading {}: {e}", file.display()));
                    continue;
                }
            };
            let Some(block) = GuardBlock::parse(&content, &self.markers) else {
                continue;
            };
            match std::fs::write(&file, block.without_block()) {
                Ok(()) => {
                    tracing::info!(file = %file.display(), "removed PATH configuration");
                    cleaned.push(file);
                }
                Err(e) => failures.push(format!("writing {}: {e}", file.display())),
            }
        }

        (cleaned, failures)
    }

    /// Whether `dir` is already a segment of the process PATH.
    pub fn is_on_path(&self, dir: &Path) -> bool {
        let Some(path) = self.env.var("PATH") else {
            return false;
        };
        let home = self.env.home_dir();
        std::env::split_paths(&path)
            .filter(|segment| !segment.as_os_str().is_empty())
            .any(|segment| {
                let segment = expand_home(&segment.to_string_lossy(), home.as_deref());
                same_dir(&segment, dir)
            })
    }

    /// Whether `content` already has an uncommented PATH assignment that
    /// includes `dir`, in any of its spellings.
    fn profile_adds(&self, content: &str, shell: ShellKind, dir: &Path) -> bool {
        self.spellings(dir).iter().any(|spelling| {
            let dir = regex::escape(spelling.trim_end_matches('/'));
            let pattern = match shell {
                ShellKind::Bash | ShellKind::Zsh => format!(
                    r#"(?m)^[ \t]*(?:export[ \t]+)?PATH=(?:[^\n]*[:"'])?{dir}/?(?:[:"' \t;]|$)"#
                ),
                ShellKind::Fish => format!(
                    r#"(?m)^[ \t]*(?:set[ \t]+(?:-[A-Za-z]+[ \t]+)*PATH|fish_add_path(?:[ \t]+-[A-Za-z]+)*)[ \t]+(?:[^\n]*[ \t"'])?{dir}/?(?:["' \t;]|$)"#
                ),
            };
            Regex::new(&pattern).is_ok_and(|re| re.is_match(content))
        })
    }

    /// `dir` as written literally, and via `~`/`$HOME` when under home.
    fn spellings(&self, dir: &Path) -> Vec<String> {
        let mut spellings = vec![dir.display().to_string()];
        if let Some(home) = self.env.home_dir() {
            if is_path_under(dir, &home) {
                if let Ok(rel) = dir.strip_prefix(&home) {
                    let rel = rel.display();
                    spellings.push(format!("$HOME/{rel}"));
                    spellings.push(format!("${{HOME}}/{rel}"));
                    spellings.push(format!("~/{rel}"));
                }
            }
        }
        spellings
    }
}

fn write_profile(file: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(file, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnvironment;
    use tempfile::{tempdir, TempDir};

    fn bash_home() -> (TempDir, MapEnvironment) {
        let home = tempdir().unwrap();
        let env = MapEnvironment::new(home.path())
            .with_var("SHELL", "/bin/bash")
            .with_var("PATH", "/usr/bin:/bin");
        (home, env)
    }

    #[test]
    fn test_adds_guard_block_to_bashrc() {
        let (home, env) = bash_home();
        let mutator = PathMutator::new(&env, "Claude Code");

        let result = mutator.ensure_on_path(Path::new("/x/bin"));

        assert!(result.success);
        assert!(result.path_added);
        assert!(result.needs_reload);
        let bashrc = home.path().join(".bashrc");
        assert_eq!(result.config_files, vec![bashrc.clone()]);
        let content = std::fs::read_to_string(bashrc).unwrap();
        assert_eq!(
            content,
            "# Claude Code PATH configuration\nexport PATH=\"/x/bin:$PATH\"\n# End Claude Code PATH configuration\n"
        );
    }

    #[test]
    fn test_second_call_is_byte_identical() {
        let (home, env) = bash_home();
        let bashrc = home.path().join(".bashrc");
        std::fs::write(&bashrc, "alias ll='ls -l'").unwrap();
        let mutator = PathMutator::new(&env, "Claude Code");

        mutator.ensure_on_path(Path::new("/x/bin"));
        let first = std::fs::read(&bashrc).unwrap();
        let second_result = mutator.ensure_on_path(Path::new("/x/bin"));
        let second = std::fs::read(&bashrc).unwrap();

        assert_eq!(first, second);
        assert!(second_result.success);
        assert!(!second_result.path_added);
        assert!(!second_result.needs_reload);
    }

    #[test]
    fn test_second_dir_joins_existing_block() {
        let (home, env) = bash_home();
        let mutator = PathMutator::new(&env, "Claude Code");

        mutator.ensure_on_path(Path::new("/x/bin"));
        let result = mutator.ensure_on_path(Path::new("/y/bin"));

        assert!(result.path_added);
        let content = std::fs::read_to_string(home.path().join(".bashrc")).unwrap();
        assert_eq!(content.matches("# Claude Code PATH configuration").count(), 1);
        assert_eq!(content.matches("# End Claude Code PATH configuration").count(), 1);
        assert!(content.contains("export PATH=\"/x/bin:$PATH\"\nexport PATH=\"/y/bin:$PATH\"\n"));
    }

    #[test]
    fn test_dir_on_process_path_is_untouched() {
        let home = tempdir().unwrap();
        let env = MapEnvironment::new(home.path())
            .with_var("SHELL", "/bin/zsh")
            .with_var("PATH", "/usr/bin:/x/bin/:/bin");
        let result = PathMutator::new(&env, "Claude Code").ensure_on_path(Path::new("/x/bin"));

        assert!(result.success);
        assert!(!result.path_added);
        assert!(!home.path().join(".zshrc").exists());
    }

    #[test]
    fn test_tilde_segment_on_process_path_counts() {
        let home = tempdir().unwrap();
        let env = MapEnvironment::new(home.path())
            .with_var("SHELL", "/bin/zsh")
            .with_var("PATH", "~/.local/bin:/usr/bin");
        let dir = home.path().join(".local/bin");
        let result = PathMutator::new(&env, "Claude Code").ensure_on_path(&dir);
        assert!(!result.path_added);
    }

    #[test]
    fn test_manual_export_in_profile_is_respected() {
        let (home, env) = bash_home();
        let bashrc = home.path().join(".bashrc");
        let manual = "export PATH=\"$PATH:$HOME/.npm-global/bin\"\n";
        std::fs::write(&bashrc, manual).unwrap();

        let dir = home.path().join(".npm-global/bin");
        let result = PathMutator::new(&env, "Claude Code").ensure_on_path(&dir);

        assert!(result.success);
        assert!(!result.path_added);
        assert_eq!(std::fs::read_to_string(&bashrc).unwrap(), manual);
    }

    #[test]
    fn test_commented_export_does_not_count() {
        let (home, env) = bash_home();
        let bashrc = home.path().join(".bashrc");
        std::fs::write(&bashrc, "# export PATH=\"/x/bin:$PATH\"\n").unwrap();

        let result = PathMutator::new(&env, "Claude Code").ensure_on_path(Path::new("/x/bin"));
        assert!(result.path_added);
    }

    #[test]
    fn test_regex_metacharacters_in_dir() {
        let (home, env) = bash_home();
        let bashrc = home.path().join(".bashrc");
        // `.` would match any char if unescaped.
        std::fs::write(&bashrc, "export PATH=\"/opt/aXb+(1)/bin:$PATH\"\n").unwrap();
        let mutator = PathMutator::new(&env, "Claude Code");

        let dir = Path::new("/opt/a.b+(1)/bin");
        let first = mutator.ensure_on_path(dir);
        assert!(first.path_added);
        let second = mutator.ensure_on_path(dir);
        assert!(!second.path_added);
    }

    #[test]
    fn test_prefix_dir_is_not_a_match() {
        let (home, env) = bash_home();
        std::fs::write(home.path().join(".bashrc"), "export PATH=\"/x/bin2:$PATH\"\n").unwrap();
        let result = PathMutator::new(&env, "Claude Code").ensure_on_path(Path::new("/x/bin"));
        assert!(result.path_added);
    }

    #[test]
    fn test_fish_config_created_with_set_line() {
        let home = tempdir().unwrap();
        let env = MapEnvironment::new(home.path())
            .with_var("SHELL", "/usr/bin/fish")
            .with_var("PATH", "/usr/bin");
        let mutator = PathMutator::new(&env, "Codex");

        let result = mutator.ensure_on_path(Path::new("/x/bin"));
        assert!(result.path_added);

        let config = home.path().join(".config/fish/config.fish");
        let content = std::fs::read_to_string(&config).unwrap();
        assert!(content.contains("# Codex PATH configuration\nset -gx PATH /x/bin $PATH\n"));

        let again = mutator.ensure_on_path(Path::new("/x/bin"));
        assert!(!again.path_added);
    }

    #[test]
    fn test_fish_add_path_counts() {
        let home = tempdir().unwrap();
        let env = MapEnvironment::new(home.path())
            .with_var("SHELL", "fish")
            .with_var("PATH", "/usr/bin");
        let config = home.path().join(".config/fish/config.fish");
        std::fs::create_dir_all(config.parent().unwrap()).unwrap();
        std::fs::write(&config, "fish_add_path -g /x/bin\n").unwrap();

        let result = PathMutator::new(&env, "Codex").ensure_on_path(Path::new("/x/bin"));
        assert!(!result.path_added);
    }

    #[test]
    fn test_unknown_shell_is_safe_noop() {
        let home = tempdir().unwrap();
        let env = MapEnvironment::new(home.path())
            .with_var("SHELL", "/bin/tcsh")
            .with_var("PATH", "/usr/bin");
        let result = PathMutator::new(&env, "Claude Code").ensure_on_path(Path::new("/x/bin"));

        assert!(result.success);
        assert!(!result.path_added);
        assert!(result.warning.unwrap().contains("export PATH=\"/x/bin:$PATH\""));
        assert_eq!(std::fs::read_dir(home.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_unwritable_profile_reports_error() {
        let (home, env) = bash_home();
        // A directory where the file should be makes both read and write fail.
        std::fs::create_dir(home.path().join(".bashrc")).unwrap();
        let result = PathMutator::new(&env, "Claude Code").ensure_on_path(Path::new("/x/bin"));
        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_remove_guard_blocks_restores_files() {
        let (home, env) = bash_home();
        let bashrc = home.path().join(".bashrc");
        let zshrc = home.path().join(".zshrc");
        std::fs::write(&bashrc, "alias ll='ls -l'\n").unwrap();
        std::fs::write(&zshrc, "setopt autocd\n").unwrap();
        let mutator = PathMutator::new(&env, "Claude Code");
        mutator.ensure_on_path(Path::new("/x/bin"));

        let (cleaned, failures) = mutator.remove_guard_blocks();

        assert_eq!(cleaned, vec![bashrc.clone()]);
        assert!(failures.is_empty());
        assert_eq!(std::fs::read_to_string(&bashrc).unwrap(), "alias ll='ls -l'\n");
        assert_eq!(std::fs::read_to_string(&zshrc).unwrap(), "setopt autocd\n");
    }

    #[test]
    fn test_interrupted_block_is_repaired_without_losing_user_lines() {
        let (home, env) = bash_home();
        let bashrc = home.path().join(".bashrc");
        std::fs::write(
            &bashrc,
            "# Claude Code PATH configuration\nexport PATH=\"/a:$PATH\"\nalias keepme=1\n# Claude Code PATH configuration\nexport PATH=\"/b:$PATH\"\n# End Claude Code PATH configuration\n",
        )
        .unwrap();
        let mutator = PathMutator::new(&env, "Claude Code");

        let result = mutator.ensure_on_path(Path::new("/c"));

        assert!(result.path_added);
        let content = std::fs::read_to_string(&bashrc).unwrap();
        assert_eq!(content.matches("# Claude Code PATH configuration").count(), 1);
        assert_eq!(content.matches("# End Claude Code PATH configuration").count(), 1);
        assert!(content.contains("alias keepme=1\n"));
        assert!(content.contains("export PATH=\"/c:$PATH\""));

        let (cleaned, failures) = mutator.remove_guard_blocks();
        assert_eq!(cleaned, vec![bashrc.clone()]);
        assert!(failures.is_empty());
        assert_eq!(std::fs::read_to_string(&bashrc).unwrap(), "alias keepme=1\n");
    }

    #[test]
    fn test_home_with_space_is_quoted_and_idempotent() {
        let root = tempdir().unwrap();
        let home = root.path().join("my user");
        std::fs::create_dir_all(&home).unwrap();
        let env = MapEnvironment::new(&home)
            .with_var("SHELL", "/usr/bin/fish")
            .with_var("PATH", "/usr/bin");
        let mutator = PathMutator::new(&env, "Codex");
        let dir = home.join(".local/bin");

        assert!(mutator.ensure_on_path(&dir).path_added);
        let config = home.join(".config/fish/config.fish");
        let first = std::fs::read_to_string(&config).unwrap();
        assert!(first.contains(&format!("set -gx PATH '{}' $PATH\n", dir.display())));

        assert!(!mutator.ensure_on_path(&dir).path_added);
        assert_eq!(std::fs::read_to_string(&config).unwrap(), first);
    }
}
