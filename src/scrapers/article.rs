//! Article body extraction.
//!
//! An article page is queried with the configured body selector (for example
//! `.storyDetail > p`). Each matched element's text is trimmed, empty ones are
//! dropped, and the rest are joined with a blank line between them.

use crate::error::ConfigError;
use crate::models::FetchResult;
use scraper::{Html, Selector};
use tracing::debug;

/// A validated CSS selector together with the text it was parsed from.
#[derive(Debug, Clone)]
pub struct BodySelector {
    source: String,
    selector: Selector,
}

impl BodySelector {
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        let selector = Selector::parse(source).map_err(|e| ConfigError::Selector {
            selector: source.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            source: source.to_string(),
            selector,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Join text fragments into one body.
///
/// Fragments are trimmed; empty ones are skipped; the remaining ones are
/// separated by a blank line.
pub fn assemble_body<I, S>(fragments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut body = String::new();
    for fragment in fragments {
        let text = fragment.as_ref().trim();
        if text.is_empty() {
            continue;
        }
        if !body.is_empty() {
            body.push_str("\n\n");
        }
        body.push_str(text);
    }
    body
}

/// Query `html` for the body selector and build the result for `index`.
///
/// A selector that matches nothing yields a diagnostic body naming the
/// locator and selector rather than an error.
pub fn extract_body(index: usize, locator: &str, html: &str, selector: &BodySelector) -> FetchResult {
    let document = Html::parse_document(html);
    let fragments: Vec<String> = document
        .select(&selector.selector)
        .map(|element| element.text().collect::<String>())
        .collect();

    if fragments.is_empty() {
        debug!(index, %locator, selector = selector.as_str(), "Body selector matched nothing");
        return FetchResult::no_matches(index, locator, selector.as_str());
    }

    let body = assemble_body(&fragments);
    debug!(index, fragments = fragments.len(), bytes = body.len(), "Extracted article body");
    FetchResult::loaded(index, body)
}
