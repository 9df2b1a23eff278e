// Prompt templates for blueprint generation and the single repair round-trip

use crate::util::truncate_chars;

/// Characters of verifier output embedded in the repair prompt.
pub const FEEDBACK_CHARS: usize = 4000;

pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that outputs Rust Scrypto blueprints.";

pub const DEFAULT_PROMPT: &str = r#"
Generate a minimal Scrypto blueprint (Rust) that compiles with scrypto and is runnable in a scrypto package.
Return the Rust code only inside a fenced code block, language tag 'rust' preferred.
The blueprint should be trivial: one blueprint with a `new` constructor and a simple method `hello` that returns a string.
"#;

/// Build the follow-up request sent after a failed test run.
///
/// Only the first [`FEEDBACK_CHARS`] characters of `failure_output` are
/// included.
pub fn repair_prompt(original_prompt: &str, failure_output: &str) -> String {
    format!(
        r#"{}

The project failed to compile/run with the following compiler/test output. Please reply with a corrected Rust Scrypto `lib.rs` inside a fenced ```rust ... ``` block that compiles.

Compiler output:
```
{}
```
Please only return the corrected Rust code in a fenced code block."#,
        original_prompt,
        truncate_chars(failure_output, FEEDBACK_CHARS)
    )
}
