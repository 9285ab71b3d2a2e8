//! Ordered, match-exactly rewrites of a target file's content.

use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::patch::constants::PATCH_TAG;
use crate::patch::error::PatchError;
use crate::targets::TargetFile;

/// Static description of a rule, as written in the per-version tables.
///
/// The match is three literal pieces: `leading` and `trailing` are anchors that
/// survive the rewrite, `original` is the block that gets replaced by
/// `replacement`.
#[derive(Debug, Clone, Copy)]
pub struct RuleSpec {
    pub name: &'static str,
    pub summary: &'static str,
    /// Upstream line range of `original`, first and last line inclusive
    pub lines: (u32, u32),
    pub leading: &'static str,
    pub original: &'static str,
    pub trailing: &'static str,
    pub replacement: &'static str,
}

/// A compiled rule.
#[derive(Debug, Clone)]
pub struct TransformRule {
    spec: RuleSpec,
    pattern: Regex,
}

impl TransformRule {
    /// Compile a rule. Fails if the replacement does not embed the patch marker.
    pub fn new(spec: RuleSpec) -> Result<Self, PatchError> {
        if !spec.replacement.contains(PATCH_TAG) {
            return Err(PatchError::MissingMarker { rule: spec.name });
        }

        let source = format!(
            "(?P<leading>{}){}(?P<trailing>{})",
            regex::escape(spec.leading),
            regex::escape(spec.original),
            regex::escape(spec.trailing)
        );
        let pattern = Regex::new(&source).map_err(|e| PatchError::InvalidPattern {
            name: spec.name.to_string(),
            reason: e.to_string(),
        })?;

        Ok(TransformRule { spec, pattern })
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn summary(&self) -> &'static str {
        self.spec.summary
    }

    pub fn spec(&self) -> &RuleSpec {
        &self.spec
    }

    /// Human-readable upstream location, e.g. `lines 1064-1070`.
    pub fn location(&self) -> String {
        let (start, end) = self.spec.lines;
        format!("lines {}-{}", start, end)
    }

    /// Rewrite the first match. Returns `None` when the block is not present.
    pub fn apply(&self, content: &str) -> Option<String> {
        let caps = self.pattern.captures(content)?;
        let whole = caps.get(0)?;
        debug!(rule = self.spec.name, offset = whole.start(), "rule matched");

        let mut out = String::with_capacity(content.len() + self.spec.replacement.len());
        out.push_str(&content[..whole.start()]);
        out.push_str(&caps["leading"]);
        out.push_str(self.spec.replacement);
        out.push_str(&caps["trailing"]);
        out.push_str(&content[whole.end()..]);
        Some(out)
    }
}

/// Result of running a target's rules over its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutcome {
    pub content: String,
    /// Names of the rules that rewrote something, in order
    pub applied: Vec<&'static str>,
    /// The input already carried the patch marker; no rule was attempted
    pub already_patched: bool,
}

impl TransformOutcome {
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Apply every rule of `target` to `content`, in order.
///
/// Content that already carries the patch marker is returned unchanged. Any
/// rule that matches nothing aborts with [`PatchError::RuleNotMatched`].
pub fn apply_rules(
    path: &Path,
    content: &str,
    target: &TargetFile,
) -> Result<TransformOutcome, PatchError> {
    if content.contains(PATCH_TAG) {
        debug!(file = target.key, "patch marker present, skipping rules");
        return Ok(TransformOutcome {
            content: content.to_string(),
            applied: Vec::new(),
            already_patched: true,
        });
    }

    let mut text = content.to_string();
    let mut applied = Vec::with_capacity(target.rules.len());

    for rule in &target.rules {
        text = rule.apply(&text).ok_or_else(|| {
            let (start, end) = rule.spec().lines;
            PatchError::RuleNotMatched {
                path: path.to_path_buf(),
                rule: rule.name(),
                location: rule.location(),
                reference: format!("{}#L{}-{}", target.reference, start, end),
            }
        })?;
        applied.push(rule.name());
    }

    Ok(TransformOutcome {
        content: text,
        applied,
        already_patched: false,
    })
}
