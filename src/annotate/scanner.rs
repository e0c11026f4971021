// src/annotate/scanner.rs
// =============================================================================
// This module finds URL-shaped tokens inside arbitrary text.
//
// We don't parse Markdown here. README files mix Markdown links, bare links,
// HTML attributes and badges, and all of them should be annotated. A single
// regular expression catches both shapes:
//   - scheme://host.tld/path?query#fragment
//   - host.tld/path (no scheme)
//
// Trailing punctuation like the period ending a sentence or the closing
// parenthesis of a Markdown link is not part of the match.
//
// Rust concepts:
// - LazyLock: Compile the regex once, on first use
// - Iterators: find_iter is lazy and can be restarted by calling it again
// - Lifetimes: The returned &str slices borrow from the input text
// =============================================================================

use std::sync::LazyLock;

use regex::{Match, Regex};

// An optional "local-part@" prefix keeps email addresses in one token, so
// "alias@microsoft.com" is never split into a bare "microsoft.com".
// The last character class leaves out '.', ',' and ':' so that sentence
// punctuation stays outside the match.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:[\w.+\-]+@)?(?:(?:https?|ftp)://)?[\w\-]+(?:\.[\w\-]+)+(?:[\w\-.,@?^=%&;:/~+#]*[\w\-@?^=%&;/~+#])?",
    )
    .expect("valid regex")
});

// Finds every URL-looking substring in `text`, left to right, without
// overlaps. Each Match knows its byte range so callers can splice.
//
// No network lookups are made: "looks like a URL" is all we check.
// Text without matches simply yields nothing.
//
// Example:
//   "See https://azure.com/docs for details." -> ["https://azure.com/docs"]
pub fn find_urls(text: &str) -> impl Iterator<Item = Match<'_>> + '_ {
    URL_RE.find_iter(text)
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is impl Iterator<Item = Match<'_>> + '_?
//    - "Some iterator type that yields matches"
//    - The '_ says the iterator (and each Match) borrows from `text`
//    - Nothing is searched until the caller pulls the next item
//
// 2. Why a static LazyLock?
//    - Compiling a regex is expensive compared to running it
//    - LazyLock runs the closure once, the first time URL_RE is used
// -----------------------------------------------------------------------------
