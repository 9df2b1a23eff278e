//! Pull Rust source out of a model reply.

use once_cell::sync::Lazy;
use regex::Regex;

/// A ```rust (or untagged) fenced block; the tag is case-insensitive.
static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```(?:rust)?\r?\n(.*?)```").expect("valid fenced-block regex"));

/// Unfenced replies: everything from the Scrypto prelude import onwards.
static PRELUDE_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)use\s+scrypto.*").expect("valid prelude regex"));

/// Extract source code from `text`.
///
/// The first fenced block wins; otherwise the text from the first
/// `use scrypto` to the end. The result is trimmed. An empty match counts as
/// no source. Nothing here checks that the code compiles.
pub fn extract_source(text: &str) -> Option<String> {
    let found = if let Some(caps) = FENCED_BLOCK.captures(text) {
        caps.get(1).map(|m| m.as_str())
    } else {
        PRELUDE_TAIL.find(text).map(|m| m.as_str())
    };

    found
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
}
