//! The guard block: the one region of a shell startup file this installer
//! owns.
//!
//! ```text
//! # Claude Code PATH configuration
//! export PATH="/home/alice/.npm-global/bin:$PATH"
//! # End Claude Code PATH configuration
//! ```
//!
//! Files are parsed into `{preamble, lines, postamble}` and serialized back,
//! so edits never depend on pattern-matching user content.

use std::path::Path;

/// Start/end marker lines for one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardMarkers {
    pub start: String,
    pub end: String,
}

impl GuardMarkers {
    pub fn for_tool(display_name: &str) -> Self {
        Self {
            start: format!("# {display_name} PATH configuration"),
            end: format!("# End {display_name} PATH configuration"),
        }
    }
}

/// A file split around its guard block.
///
/// `preamble` and `postamble` are kept byte-for-byte; `lines` are the block
/// body without line terminators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardBlock {
    pub preamble: String,
    pub lines: Vec<String>,
    pub postamble: String,
}

impl GuardBlock {
    /// Split `content` around the first guard block, or `None` if it has none.
    ///
    /// A start marker whose next marker is not an end marker (an interrupted
    /// earlier write) covers only the PATH lines that directly follow it.
    /// Any later blocks for the same tool are folded into the first one and
    /// everything outside them stays in the postamble, so rendering always
    /// yields a single terminated block.
    pub fn parse(content: &str, markers: &GuardMarkers) -> Option<Self> {
        let lines = split_lines_inclusive(content);
        let start = lines.iter().position(|l| l.trim() == markers.start)?;

        let preamble: String = lines[..start].concat();
        let mut body = Vec::new();
        let mut postamble = String::new();

        let mut i = take_block(&lines, start + 1, markers, &mut body);
        while i < lines.len() {
            if lines[i].trim() == markers.start {
                i = take_block(&lines, i + 1, markers, &mut body);
            } else {
                postamble.push_str(lines[i]);
                i += 1;
            }
        }

        Some(Self {
            preamble,
            lines: body,
            postamble,
        })
    }

    pub fn render(&self, markers: &GuardMarkers) -> String {
        let mut out = self.preamble.clone();
        out.push_str(&markers.start);
        out.push('\n');
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&markers.end);
        out.push('\n');
        out.push_str(&self.postamble);
        out
    }

    /// Replace the line that adds `dir` with `line`, or append `line` if no
    /// body line adds `dir`. Returns whether the body changed.
    pub fn upsert(&mut self, dir: &Path, line: String) -> bool {
        match self
            .lines
            .iter()
            .position(|existing| path_line_dir(existing).is_some_and(|d| same_entry(&d, dir)))
        {
            Some(i) if self.lines[i] == line => false,
            Some(i) => {
                self.lines[i] = line;
                true
            }
            None => {
                self.lines.push(line);
                true
            }
        }
    }

    /// The file as it was before the block was added: preamble and
    /// postamble joined, trailing whitespace trimmed, one final newline.
    pub fn without_block(&self) -> String {
        let joined = format!("{}{}", self.preamble, self.postamble);
        let trimmed = joined.trim_end();
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{trimmed}\n")
        }
    }
}

/// `content` with a fresh guard block holding `line` appended.
pub fn append_block(content: &str, markers: &GuardMarkers, line: String) -> String {
    let mut preamble = content.to_string();
    if !preamble.is_empty() {
        if !preamble.ends_with('\n') {
            preamble.push('\n');
        }
        preamble.push('\n');
    }
    GuardBlock {
        preamble,
        lines: vec![line],
        postamble: String::new(),
    }
    .render(markers)
}

/// Collect the body of a block whose start marker precedes `from` into
/// `body` and return the index of the first line after it.
fn take_block(lines: &[&str], from: usize, markers: &GuardMarkers, body: &mut Vec<String>) -> usize {
    let next_marker = lines[from..]
        .iter()
        .position(|l| {
            let l = l.trim();
            l == markers.start || l == markers.end
        })
        .map(|offset| from + offset);

    let (end, resume) = match next_marker {
        Some(end) if lines[end].trim() == markers.end => (end, end + 1),
        _ => {
            let len = lines[from..].iter().take_while(|l| is_path_line(l)).count();
            (from + len, from + len)
        }
    };

    for line in &lines[from..end] {
        let line = line.trim_end_matches(['\n', '\r']).to_string();
        if !body.contains(&line) {
            body.push(line);
        }
    }
    resume
}

/// The directory a `export PATH="<dir>:$PATH"` or `set -gx PATH <dir> $PATH`
/// line prepends, with shell quoting undone.
fn path_line_dir(line: &str) -> Option<String> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix("export PATH=\"") {
        return rest.strip_suffix(":$PATH\"").map(unescape);
    }
    if let Some(rest) = line.strip_prefix("set -gx PATH ") {
        let dir = rest.strip_suffix(" $PATH")?;
        return Some(match dir.strip_prefix('\'').and_then(|d| d.strip_suffix('\'')) {
            Some(quoted) => unescape(quoted),
            None => dir.trim_matches('"').to_string(),
        });
    }
    None
}

/// Drop the backslash from every `\x` pair.
fn unescape(quoted: &str) -> String {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn is_path_line(line: &str) -> bool {
    path_line_dir(line).is_some()
}

fn same_entry(existing: &str, dir: &Path) -> bool {
    crate::paths::same_dir(Path::new(existing), dir)
}

fn split_lines_inclusive(content: &str) -> Vec<&str> {
    content.split_inclusive('\n').collect()
}
