use std::io::{self, Write};

use similar::{ChangeTag, TextDiff};

/// Unchanged lines shown around each change
pub const CONTEXT_RADIUS: usize = 3;

/// Unified, line-based diff between the before and after content of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffReport {
    label: String,
    lines: Vec<String>,
}

impl DiffReport {
    pub fn new(label: &str, before: &str, after: &str) -> Self {
        let diff = TextDiff::from_lines(before, after);
        let mut unified = diff.unified_diff();
        unified.context_radius(CONTEXT_RADIUS);

        let mut lines = Vec::new();
        for hunk in unified.iter_hunks() {
            if lines.is_empty() {
                lines.push(format!("--- {} (before)", label));
                lines.push(format!("+++ {} (after)", label));
            }
            lines.push(hunk.header().to_string());
            for change in hunk.iter_changes() {
                let sign = match change.tag() {
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                    ChangeTag::Equal => ' ',
                };
                let value = change.value().trim_end_matches(['\n', '\r']);
                lines.push(format!("{}{}", sign, value));
            }
        }

        DiffReport {
            label: label.to_string(),
            lines,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Print the diff, showing at most `max_lines` lines.
    ///
    /// Returns `false` (after printing a skip notice) when there is nothing to show.
    pub fn write_to<W: Write>(&self, out: &mut W, max_lines: usize) -> io::Result<bool> {
        if self.is_empty() {
            writeln!(out, "[SKIP] {}: already patched or no changes needed", self.label)?;
            return Ok(false);
        }

        writeln!(out)?;
        writeln!(out, "[DIFF] {}:", self.label)?;
        for line in self.lines.iter().take(max_lines) {
            writeln!(out, "{}", line)?;
        }
        if self.lines.len() > max_lines {
            writeln!(out, "  ... (diff truncated)")?;
        }
        Ok(true)
    }
}
