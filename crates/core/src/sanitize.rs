use std::sync::LazyLock;

use regex::Regex;

static ANSI_SGR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("ansi pattern is valid"));
static STACK_FRAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*at ").expect("stack frame pattern is valid"));
static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\n+").expect("blank run pattern is valid"));

/// Remove terminal color/format escape sequences.
#[must_use]
pub fn strip_ansi(text: &str) -> String {
    ANSI_SGR.replace_all(text, "").into_owned()
}

/// Turn a raw assertion failure into the short message shown to the learner.
///
/// Strips colors and a leading `Error: `, cuts the stack trace, collapses
/// blank lines and trims.
#[must_use]
pub fn sanitize_failure_message(raw: &str) -> String {
    let plain = strip_ansi(raw);
    let unprefixed = plain.strip_prefix("Error: ").unwrap_or(&plain);
    let head = STACK_FRAME
        .split(unprefixed)
        .next()
        .unwrap_or(unprefixed);
    BLANK_RUN.replace_all(head, "\n").trim().to_string()
}
