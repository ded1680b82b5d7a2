//! Evidence-marker removal for AI narratives
//!
//! Generated narratives cite their evidence inline, either as bracketed spans
//! (`[cite:42]`) or as parentheticals naming an evidence section
//! (`(market_data: 1h bars)`). Both are stripped before display, in two
//! passes: brackets first, then marker parentheticals on the result.

use regex::Regex;
use std::sync::LazyLock;

/// Tokens that identify a parenthetical as an evidence reference
pub const MARKER_TOKENS: [&str; 8] = [
    "account_summary",
    "market_",
    "behavior_flags",
    "performance_by_regime",
    "anomalies",
    "counterfactual",
    "notes",
    "schema_version",
];

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]+\]").expect("static bracket pattern"));

static MARKER_PARENTHETICAL: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives = MARKER_TOKENS
        .iter()
        .map(|token| regex::escape(token))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\([^)]*(?:{alternatives})[^)]*\)")).expect("static marker pattern")
});

/// Remove every non-empty `[...]` span, brackets included
pub fn strip_bracketed(text: &str) -> String {
    BRACKETED.replace_all(text, "").into_owned()
}

/// Remove every `(...)` group whose content mentions a marker token
pub fn strip_marker_parentheticals(text: &str) -> String {
    MARKER_PARENTHETICAL.replace_all(text, "").into_owned()
}

/// Strip evidence markers: brackets, then marker parentheticals
pub fn sanitize(text: &str) -> String {
    strip_marker_parentheticals(&strip_bracketed(text))
}
