//! Heuristic markdown linting.
//!
//! This is not a CommonMark validator. It looks for two common authoring
//! mistakes line by line and reports them with 1-based line numbers:
//!
//! - ATX headers with no space after the hashes (`##Title`).
//! - Inline link targets containing raw spaces (`[x](http://a b)`), except
//!   fragment (`#...`) and relative (`./`, `../`) targets.
//!
//! Lines inside fenced code blocks are checked like any other line, so a
//! `#comment` in a shell snippet is reported.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static HEADER_MISSING_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#+[^#\s]").expect("valid header regex"));

static INLINE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]+)\)").expect("valid link regex"));

const EXEMPT_TARGET_PREFIXES: [&str; 3] = ["#", "./", "../"];

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// `true` when no issue was found.
    pub valid: bool,
    /// Human readable issues in discovery order, each prefixed with its line.
    pub issues: Vec<String>,
    /// Number of `\n`-separated lines, counting a trailing empty line.
    pub line_count: usize,
    /// Number of whitespace-delimited tokens.
    pub word_count: usize,
}

/// Lint `content` and collect counts.
pub fn validate(content: &str) -> ValidationReport {
    let mut issues = Vec::new();
    let mut line_count = 0;

    for (idx, line) in content.split('\n').enumerate() {
        let line_no = idx + 1;
        line_count = line_no;

        if HEADER_MISSING_SPACE.is_match(line.trim()) {
            issues.push(format!("Line {line_no}: Header missing space after #"));
        }

        for caps in INLINE_LINK.captures_iter(line) {
            let target = &caps[2];
            if target.contains(' ') && !is_exempt_target(target) {
                issues.push(format!("Line {line_no}: URL contains unescaped spaces"));
            }
        }
    }

    ValidationReport {
        valid: issues.is_empty(),
        issues,
        line_count,
        word_count: content.split_whitespace().count(),
    }
}

fn is_exempt_target(target: &str) -> bool {
    EXEMPT_TARGET_PREFIXES
        .iter()
        .any(|prefix| target.starts_with(prefix))
}
