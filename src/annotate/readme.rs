// src/annotate/readme.rs
// =============================================================================
// This module rewrites every eligible link in a README body.
//
// It is a single left-to-right pass: each match from the scanner is replaced
// by whatever annotate_link returns for it, and the text between matches is
// copied through untouched. Running it again on its own output changes
// nothing, because annotated links already carry the tracking key.
// =============================================================================

use super::rules::annotate_link;
use super::scanner::find_urls;
use super::TrackingContext;

// Result of transforming one README.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    pub text: String,
    /// True iff `text` differs from the input byte for byte.
    pub changed: bool,
}

// Annotates all links in `readme` for the given repository and alias.
//
// Example:
//   transform_readme("See https://azure.com/docs for details.", "My-Repo", "jdoe")
//   -> text: "See https://azure.com/docs?WT.mc_id=myrepo-github-jdoe for details."
//      changed: true
pub fn transform_readme(readme: &str, repository_name: &str, alias: &str) -> Transformed {
    let context = TrackingContext::new(repository_name, alias);

    let mut text = String::with_capacity(readme.len());
    let mut copied_up_to = 0;

    for link in find_urls(readme) {
        text.push_str(&readme[copied_up_to..link.start()]);
        text.push_str(&annotate_link(link.as_str(), &context));
        copied_up_to = link.end();
    }
    text.push_str(&readme[copied_up_to..]);

    let changed = text != readme;
    Transformed { text, changed }
}
