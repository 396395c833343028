//! Output normalizer - turns loosely formatted model output into clean code.
//!
//! Models wrap code in markdown fences, emit CRLF line endings, flatten whole
//! test files onto one line, or pad empty lines with spaces. This module is a
//! fixed sequence of textual passes that undoes the common damage:
//! - Extract the first fenced code block (drop prose around it)
//! - Normalize line endings to LF
//! - De-flatten degenerate single-line output at Python block boundaries
//! - Collapse runs of two or more spaces to a four-space indent
//! - Strip whitespace from blank lines and trim outer newlines
//!
//! The passes are heuristics, not a parser. The indent collapse can corrupt
//! multi-space alignment inside comments or string literals, and the
//! de-flattening rules are Python-shaped even though callers may request
//! tests for other languages. Both are accepted limitations.

use once_cell::sync::Lazy;
use regex::Regex;

/// First fenced block. The language tag is consumed only when it sits alone
/// on the fence line; a fence like "```def f(): pass```" keeps its content
/// intact instead of losing the leading keyword to the tag.
static FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:[A-Za-z0-9_+.-]*\n)?[ \t]*(.*?)\s*```").unwrap());

/// Block keyword after a colon: `x: def ...` -> `x:\n    def ...`
static BREAK_AFTER_COLON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z0-9]):\s+(def|class|@)").unwrap());

/// Signature colon: `def f(): body` -> `def f():\n    body`
static BREAK_AFTER_SIGNATURE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\):\s+").unwrap());

/// Block keyword after a closing paren: `...) def ...` -> `...)\ndef ...`
static BREAK_BEFORE_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\)\s+(def|class)").unwrap());

/// Two or more consecutive spaces become a single four-space indent step.
static SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

/// Lines holding only whitespace collapse to truly empty lines.
static PADDED_BLANK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s+\n").unwrap());

/// Normalize raw model output into clean, consistently indented source text.
///
/// Total function: never fails, returns an empty string for empty input.
/// Idempotent on text that is already free of double-space runs and CRLF.
pub fn normalize(text: &str) -> String {
    // Keep only the first fenced block when one exists; everything outside
    // it is commentary the caller did not ask for.
    let code = match FENCE.captures(text) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(""),
        None => text,
    };

    let mut code = code.replace("\r\n", "\n");

    // Single logical line means the model flattened the block structure.
    // Re-insert breaks where Python would indent. Best effort only.
    if !code.trim().contains('\n') {
        code = BREAK_AFTER_COLON
            .replace_all(&code, "${1}:\n    ${2}")
            .into_owned();
        code = BREAK_AFTER_SIGNATURE.replace_all(&code, "):\n    ").into_owned();
        code = BREAK_BEFORE_KEYWORD.replace_all(&code, ")\n${1}").into_owned();
    }

    let code = SPACE_RUN.replace_all(&code, "    ");
    let code = PADDED_BLANK.replace_all(&code, "\n\n");

    code.trim_matches('\n').to_string()
}
