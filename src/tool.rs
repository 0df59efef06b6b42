//! Identity of the command-line tool being installed.

use serde::{Deserialize, Serialize};

/// An npm-distributed agent CLI with a preset [`ToolSpec`].
///
/// # Example
///
/// ```rust
/// use rig_acp_installer::KnownTool;
///
/// let tool: KnownTool = "codex".parse().unwrap();
/// assert_eq!(tool.spec().package, "@openai/codex");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    strum::EnumString,
    strum::Display,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum KnownTool {
    /// Anthropic's Claude Code (`claude`)
    ClaudeCode,
    /// OpenAI's Codex CLI (`codex`)
    Codex,
    /// Google's Gemini CLI (`gemini`)
    Gemini,
    /// OpenCode (`opencode`)
    #[strum(serialize = "opencode")]
    OpenCode,
}

impl KnownTool {
    /// The install identity for this tool.
    pub fn spec(&self) -> ToolSpec {
        match self {
            Self::ClaudeCode => ToolSpec::new("Claude Code", "@anthropic-ai/claude-code", "claude"),
            Self::Codex => ToolSpec::new("Codex", "@openai/codex", "codex"),
            Self::Gemini => ToolSpec::new("Gemini CLI", "@google/gemini-cli", "gemini"),
            Self::OpenCode => ToolSpec::new("OpenCode", "opencode-ai", "opencode"),
        }
    }
}

/// What gets installed and what it is called once installed.
///
/// `display_name` is the `<Tool>` that appears in the shell guard block
/// markers, so changing it orphans blocks written by earlier runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Human-readable name (e.g. "Claude Code").
    pub display_name: String,
    /// npm package name (e.g. "@anthropic-ai/claude-code").
    pub package: String,
    /// Executable name exposed on PATH (e.g. "claude").
    pub binary: String,
}

impl ToolSpec {
    pub fn new(
        display_name: impl Into<String>,
        package: impl Into<String>,
        binary: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            package: package.into(),
            binary: binary.into(),
        }
    }

    pub fn claude_code() -> Self {
        KnownTool::ClaudeCode.spec()
    }
}

impl Default for ToolSpec {
    fn default() -> Self {
        Self::claude_code()
    }
}
