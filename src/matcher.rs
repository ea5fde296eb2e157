// 🔎 Matcher - Whole-word presence test
// A pattern matches only when bounded by non-word characters or the string edges

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;

// ============================================================================
// MATCHER
// ============================================================================

/// Compiled whole-word pattern.
///
/// Pattern syntax:
/// - Everything is literal: `c++`, `c#`, `.net`, `asp.net` need no escaping
/// - `\x` escapes are accepted and mean the literal `x` (`c\+\+` == `c++`)
/// - A `\b...\b` wrapper is accepted and ignored (the boundary is implicit)
/// - Whitespace separates the words of a phrase (`spring boot`)
///
/// Matching is case-sensitive.
#[derive(Debug, Clone)]
pub struct Matcher {
    pattern: String,
    regex: Regex,
}

impl Matcher {
    /// Compile a pattern. Fails on empty or malformed patterns.
    pub fn new(pattern: &str) -> Result<Self> {
        let words = parse_words(pattern)
            .with_context(|| format!("Malformed pattern: {:?}", pattern))?;

        let body = words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join(r"\s+");

        // Rust regex has no lookaround, so the boundaries are consumed.
        // Only presence is asked, so that is fine.
        let source = format!(r"(?:^|\W){}(?:\W|$)", body);
        let regex = Regex::new(&source)
            .with_context(|| format!("Pattern {:?} did not compile", pattern))?;

        Ok(Matcher {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as it was written
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// True if the pattern occurs as a whole word (or phrase) in `text`
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// 1 if present, 0 otherwise. Frequency is never counted.
    pub fn presence(&self, text: &str) -> u64 {
        u64::from(self.is_match(text))
    }
}

/// One-shot form of [`Matcher::new`] + [`Matcher::is_match`]
pub fn matches(pattern: &str, text: &str) -> Result<bool> {
    Ok(Matcher::new(pattern)?.is_match(text))
}

// ============================================================================
// PATTERN PARSING
// ============================================================================

/// Split a pattern into literal words, resolving escapes.
fn parse_words(pattern: &str) -> Result<Vec<String>> {
    let trimmed = strip_boundary_wrapper(pattern.trim());

    let mut words = Vec::new();
    let mut current = String::new();
    let mut chars = trimmed.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| anyhow!("dangling escape at end of pattern"))?;
                current.push(escaped);
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    if words.is_empty() {
        bail!("pattern is empty");
    }

    Ok(words)
}

fn strip_boundary_wrapper(pattern: &str) -> &str {
    let pattern = pattern.strip_prefix(r"\b").unwrap_or(pattern);
    let pattern = pattern.strip_suffix(r"\b").unwrap_or(pattern);
    pattern.trim()
}

// ============================================================================
// TESTS
// ============================================================================
