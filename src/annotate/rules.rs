// src/annotate/rules.rs
// =============================================================================
// This module decides whether a single link gets a tracking code, and
// produces the rewritten link when it does.
//
// A link qualifies when:
// 1. It contains one of the Microsoft domains below (plain substring check
//    on the whole link, not a parsed host comparison)
// 2. None of the exclusion rules match it
//
// Exclusions live in a table so new ones are added as data:
// - email addresses (name@microsoft.com)
// - links that already carry the tracking key (keeps the transform idempotent)
// - Azure DevOps links (dev.azure.com)
// - build status badges on visualstudio.com
// - XAML namespace URIs on schemas.microsoft.com
//
// Rewriting a qualifying link:
// - replace or add WT.mc_id=<event>-<channel>-<alias> in the query string
// - drop a leading locale segment from the path (/en-us/...); only a whole
//   segment counts, so /ab-cdef/... keeps its first characters
// - upgrade http to https, keeping any non-default port
//
// Rust concepts:
// - Function pointers: fn(&Link<'_>) -> bool stored in a const table
// - url::Url: A parsed, normalized URL we can edit piece by piece
// - Result and ?: Every rewrite step can fail on a weird link
// =============================================================================

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use url::Url;

use super::{AnnotateError, TrackingContext, TRACKING_QUERY_KEY};

// Domains that make a link eligible. Checked in order; the first hit decides.
const MICROSOFT_DOMAINS: &[&str] = &["microsoft.com", "msdn.com", "visualstudio.com", "azure.com"];

// "scheme://" at the very start of a link. A "://" further along belongs to
// a URL nested in the path or query of a bare link.
static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("valid regex"));

// A two-letter-dash-two-letter path segment at the start of the path.
static LOCALE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/\w{2}-\w{2}(/|$)").expect("valid regex"));

// The link as it came out of the scanner, plus a lower-cased copy for the
// case-insensitive checks.
struct Link<'a> {
    raw: &'a str,
    lower: String,
}

impl<'a> Link<'a> {
    fn new(raw: &'a str) -> Self {
        Self {
            raw,
            lower: raw.to_lowercase(),
        }
    }

    fn contains_ignore_case(&self, needle: &str) -> bool {
        self.lower.contains(&needle.to_lowercase())
    }
}

// One reason to leave a link alone.
struct Exclusion {
    name: &'static str,
    matches: fn(&Link<'_>) -> bool,
}

const EXCLUSIONS: &[Exclusion] = &[
    Exclusion {
        name: "email address",
        matches: |link| link.raw.contains('@'),
    },
    Exclusion {
        name: "already tracked",
        matches: |link| link.contains_ignore_case(TRACKING_QUERY_KEY),
    },
    Exclusion {
        name: "azure devops",
        matches: |link| link.contains_ignore_case("dev.azure.com"),
    },
    Exclusion {
        name: "build badge",
        matches: |link| {
            link.contains_ignore_case("visualstudio.com") && link.contains_ignore_case("build")
        },
    },
    Exclusion {
        name: "xaml namespace",
        matches: |link| {
            link.contains_ignore_case("schemas.microsoft.com") && link.contains_ignore_case("xaml")
        },
    },
];

// Returns the link with a tracking code added, or the link unchanged when it
// doesn't qualify or can't be parsed.
//
// Example:
//   annotate_link("http://microsoft.com/foo", &ctx)
//   -> "https://microsoft.com/foo?WT.mc_id=myrepo-github-jdoe"
pub fn annotate_link(link: &str, context: &TrackingContext) -> String {
    let Some(domain) = MICROSOFT_DOMAINS.iter().find(|d| link.contains(**d)) else {
        return link.to_string();
    };

    let candidate = Link::new(link);

    if let Some(rule) = EXCLUSIONS.iter().find(|rule| (rule.matches)(&candidate)) {
        debug!(link, domain, rule = rule.name, "link excluded");
        return link.to_string();
    }

    match rewrite(link, context) {
        Ok(rewritten) => rewritten,
        Err(e) => {
            debug!(link, error = %e, "leaving link unchanged");
            link.to_string()
        }
    }
}

// Performs the actual rewrite on a link that passed every rule.
fn rewrite(link: &str, context: &TrackingContext) -> Result<String, AnnotateError> {
    let mut url = parse_link(link)?;

    add_tracking_code(&mut url, &context.value());
    remove_locale(&mut url);

    if url.scheme() == "http" {
        // url drops default ports while parsing, so port() is only Some for
        // an explicit non-default port, which set_scheme leaves alone.
        // Switching between two special schemes never fails.
        let _ = url.set_scheme("https");
    }

    Ok(url.into())
}

// Links found without a scheme ("docs.microsoft.com/x") are treated as http.
fn parse_link(link: &str) -> Result<Url, AnnotateError> {
    let absolute = if SCHEME_RE.is_match(link) {
        link.to_string()
    } else {
        format!("http://{}", link)
    };

    Url::parse(&absolute).map_err(|source| AnnotateError::MalformedUrl {
        link: link.to_string(),
        source,
    })
}

// Replace-or-add: any earlier tracking pair is dropped, then exactly one is
// appended. All other pairs keep their order.
fn add_tracking_code(url: &mut Url, value: &str) {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !key.eq_ignore_ascii_case(TRACKING_QUERY_KEY))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair(TRACKING_QUERY_KEY, value);
}

fn remove_locale(url: &mut Url) {
    let path = LOCALE_RE.replace(url.path(), "$1").into_owned();
    if path != url.path() {
        url.set_path(&path);
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is `let ... else`?
//    - Destructure a value or bail out of the function
//    - let Some(domain) = ... else { return ...; } reads as
//      "give me the domain, or return early if there is none"
//
// 2. Why can closures live in a const?
//    - Closures that capture nothing coerce to plain fn pointers
//    - fn pointers are Copy and 'static, so they fit in a const table
//
// 3. Why into_owned()?
//    - query_pairs() borrows from the Url
//    - We must own the pairs before we start mutating that same Url
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TrackingContext {
        TrackingContext::new("My-Repo", "jdoe")
    }

    #[test]
    fn test_non_microsoft_link_unchanged() {
        assert_eq!(
            annotate_link("https://www.rust-lang.org/learn", &ctx()),
            "https://www.rust-lang.org/learn"
        );
    }

    #[test]
    fn test_adds_tracking_code() {
        assert_eq!(
            annotate_link("https://azure.com/docs", &ctx()),
            "https://azure.com/docs?WT.mc_id=myrepo-github-jdoe"
        );
    }

    #[test]
    fn test_keeps_existing_query_and_fragment() {
        assert_eq!(
            annotate_link("https://azure.com/docs?tabs=cli&view=1#intro", &ctx()),
            "https://azure.com/docs?tabs=cli&view=1&WT.mc_id=myrepo-github-jdoe#intro"
        );
    }

    #[test]
    fn test_email_address_unchanged() {
        assert_eq!(annotate_link("alias@microsoft.com", &ctx()), "alias@microsoft.com");
    }

    #[test]
    fn test_already_tracked_unchanged() {
        let link = "https://azure.com/docs?wt.MC_ID=other-github-someone";
        assert_eq!(annotate_link(link, &ctx()), link);
    }

    #[test]
    fn test_devops_unchanged() {
        let link = "https://dev.azure.com/org/project/_apis/wiki";
        assert_eq!(annotate_link(link, &ctx()), link);
    }

    #[test]
    fn test_visualstudio_build_badge_unchanged() {
        let link = "https://org.visualstudio.com/project/_apis/build/status/ci";
        assert_eq!(annotate_link(link, &ctx()), link);
    }

    #[test]
    fn test_visualstudio_without_build_rewritten() {
        assert_eq!(
            annotate_link("https://marketplace.visualstudio.com/items", &ctx()),
            "https://marketplace.visualstudio.com/items?WT.mc_id=myrepo-github-jdoe"
        );
    }

    #[test]
    fn test_xaml_namespace_unchanged() {
        let link = "http://schemas.microsoft.com/winfx/2006/xaml/presentation";
        assert_eq!(annotate_link(link, &ctx()), link);
    }

    #[test]
    fn test_schemas_without_xaml_rewritten() {
        assert_eq!(
            annotate_link("http://schemas.microsoft.com/office/word", &ctx()),
            "https://schemas.microsoft.com/office/word?WT.mc_id=myrepo-github-jdoe"
        );
    }

    #[test]
    fn test_locale_removed() {
        assert_eq!(
            annotate_link("https://docs.microsoft.com/en-us/azure/x", &ctx()),
            "https://docs.microsoft.com/azure/x?WT.mc_id=myrepo-github-jdoe"
        );
    }

    #[test]
    fn test_locale_only_path() {
        assert_eq!(
            annotate_link("https://docs.microsoft.com/en-us", &ctx()),
            "https://docs.microsoft.com/?WT.mc_id=myrepo-github-jdoe"
        );
    }

    #[test]
    fn test_locale_must_be_whole_segment() {
        assert_eq!(
            annotate_link("https://docs.microsoft.com/ab-cdef/page", &ctx()),
            "https://docs.microsoft.com/ab-cdef/page?WT.mc_id=myrepo-github-jdoe"
        );
    }

    #[test]
    fn test_http_upgraded_without_port() {
        assert_eq!(
            annotate_link("http://microsoft.com/foo", &ctx()),
            "https://microsoft.com/foo?WT.mc_id=myrepo-github-jdoe"
        );
    }

    #[test]
    fn test_http_explicit_default_port_stays_implicit() {
        assert_eq!(
            annotate_link("http://microsoft.com:80/foo", &ctx()),
            "https://microsoft.com/foo?WT.mc_id=myrepo-github-jdoe"
        );
    }

    #[test]
    fn test_http_custom_port_kept() {
        assert_eq!(
            annotate_link("http://microsoft.com:8080/foo", &ctx()),
            "https://microsoft.com:8080/foo?WT.mc_id=myrepo-github-jdoe"
        );
    }

    #[test]
    fn test_bare_link_gets_https() {
        assert_eq!(
            annotate_link("docs.microsoft.com/dotnet", &ctx()),
            "https://docs.microsoft.com/dotnet?WT.mc_id=myrepo-github-jdoe"
        );
    }

    #[test]
    fn test_bare_link_with_nested_url_gets_https() {
        assert_eq!(
            annotate_link("docs.microsoft.com/redirect?target=https://example.org", &ctx()),
            "https://docs.microsoft.com/redirect?target=https%3A%2F%2Fexample.org&WT.mc_id=myrepo-github-jdoe"
        );
    }

    #[test]
    fn test_domain_match_is_substring() {
        // The query value mentions azure.com, which is enough to qualify.
        assert_eq!(
            annotate_link("https://example.org/?ref=azure.com", &ctx()),
            "https://example.org/?ref=azure.com&WT.mc_id=myrepo-github-jdoe"
        );
    }

    #[test]
    fn test_malformed_link_unchanged() {
        let link = "http://microsoft.com:99999/foo";
        assert_eq!(annotate_link(link, &ctx()), link);
    }
}
