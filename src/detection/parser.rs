//! Version output parsing with regex extraction.

use regex::Regex;
use semver::Version;
use std::sync::OnceLock;

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+)\.(\d+)\.(\d+)(-[0-9A-Za-z.-]+)?").expect("Invalid regex pattern")
    })
}

/// Extract the first semantic version (major.minor.patch, optional
/// pre-release) from CLI output.
///
/// - `2.1.12 (Claude Code)` -> 2.1.12
/// - `codex-cli 0.87.0` -> 0.87.0
/// - `0.5.0-beta.1` -> 0.5.0-beta.1
pub fn parse_version(output: &str) -> Option<Version> {
    let caps = version_regex().captures(output)?;
    if let Ok(version) = Version::parse(caps.get(0)?.as_str()) {
        return Some(version);
    }
    // Malformed pre-release suffix: keep the numeric core.
    let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}
