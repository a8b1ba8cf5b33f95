//! Small helpers for form handling: CSRF tokens and markup stripping.

use std::fmt::Write as _;
use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

use crate::view::escape_html;

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<[^\s>][^>]*(?:>|\z)").unwrap_or_else(|e| panic!("tag regex: {e}"))
});

/// A fresh CSRF token: 32 random bytes, hex encoded.
pub fn csrf_token() -> String {
    let mut bytes = [0_u8; 32];
    rand::rng().fill(&mut bytes);

    bytes.iter().fold(String::with_capacity(64), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

/// Makes untrusted text safe to embed in HTML: trims it, drops anything that
/// looks like a tag, then escapes what is left.
///
/// ```
/// assert_eq!(sprig::clean_html("  <script>alert(1)</script> Tom & Jerry "), "alert(1) Tom &amp; Jerry");
/// ```
pub fn clean_html(input: &str) -> String {
    let stripped = TAG.replace_all(input.trim(), "");
    escape_html(stripped.trim())
}
