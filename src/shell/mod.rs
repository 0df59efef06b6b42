//! Shell startup files and the PATH entries this installer owns in them.

mod guard;
mod mutator;

pub use guard::{GuardBlock, GuardMarkers};
pub use mutator::{PathMutator, PathUpdateResult};

use crate::env::Environment;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Shells whose startup files can be edited safely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ShellKind {
    Bash,
    Zsh,
    Fish,
}

impl ShellKind {
    /// Recognize a shell from the `SHELL` variable (`/bin/zsh`, `/usr/local/bin/fish`).
    pub fn from_shell_var(shell: &str) -> Option<Self> {
        let name = Path::new(shell.trim()).file_name()?.to_str()?;
        if name.starts_with("zsh") {
            Some(Self::Zsh)
        } else if name.starts_with("fish") {
            Some(Self::Fish)
        } else if name.starts_with("bash") {
            Some(Self::Bash)
        } else {
            None
        }
    }

    /// The line that prepends `dir` to PATH in this shell's syntax.
    ///
    /// Plain directories are written as is; anything the shell would
    /// expand or split is quoted.
    pub fn path_line(&self, dir: &Path) -> String {
        let dir = dir.display().to_string();
        match self {
            Self::Fish => format!("set -gx PATH {} $PATH", fish_word(&dir)),
            Self::Bash | Self::Zsh => format!("export PATH=\"{}:$PATH\"", double_quoted(&dir)),
        }
    }

    /// The command that re-reads `config_file` in the running shell.
    pub fn reload_command(&self, config_file: &Path) -> String {
        format!("source {}", config_file.display())
    }
}

/// The startup file an interactive shell of `shell` kind sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellProfile {
    pub shell: ShellKind,
    pub config_file: PathBuf,
}

/// Map the active shell to its startup file.
///
/// - zsh: `~/.zshrc`
/// - fish: `config.fish` in `$XDG_CONFIG_HOME/fish`, else `~/.config/fish`
/// - bash: `~/.bash_profile` if it exists, else `~/.bashrc`
///
/// Returns `None` for unrecognized shells or without a home directory;
/// guessing would risk editing a file the shell never reads.
pub fn resolve_profile(env: &dyn Environment) -> Option<ShellProfile> {
    let shell = ShellKind::from_shell_var(&env.var("SHELL")?)?;
    let home = env.home_dir()?;

    let config_file = match shell {
        ShellKind::Zsh => home.join(".zshrc"),
        ShellKind::Fish => fish_config_dir(env, &home).join("config.fish"),
        ShellKind::Bash => {
            let bash_profile = home.join(".bash_profile");
            if env.exists(&bash_profile) {
                bash_profile
            } else {
                home.join(".bashrc")
            }
        }
    };

    tracing::debug!(%shell, config_file = %config_file.display(), "resolved shell profile");
    Some(ShellProfile { shell, config_file })
}

/// Every startup file a guard block may have been written to, regardless of
/// the shell in use now.
pub fn candidate_profiles(env: &dyn Environment) -> Vec<PathBuf> {
    let Some(home) = env.home_dir() else {
        return vec![];
    };
    vec![
        home.join(".zshrc"),
        home.join(".bashrc"),
        home.join(".bash_profile"),
        fish_config_dir(env, &home).join("config.fish"),
    ]
}

/// What to tell the operator to run when PATH could not be set up for them.
pub fn remediation_for(shell: Option<ShellKind>, dir: &Path) -> String {
    shell.unwrap_or(ShellKind::Bash).path_line(dir)
}

/// Escape the characters that stay special inside POSIX double quotes.
fn double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// `s` as a single fish argument: bare if it is plain, single-quoted otherwise.
fn fish_word(s: &str) -> String {
    let plain = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | '+' | ',' | ':' | '@' | '%' | '='));
    if plain {
        return s.to_string();
    }
    let mut out = String::from("'");
    for c in s.chars() {
        if matches!(c, '\\' | '\'') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

fn fish_config_dir(env: &dyn Environment, home: &Path) -> PathBuf {
    env.var("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| home.join(".config"))
        .join("fish")
}
