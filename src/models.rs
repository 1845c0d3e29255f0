//! Data models for articles as they move from the feed index to the viewer.
//!
//! - [`ArticleDescriptor`]: one entry of the feed index, before its body is fetched
//! - [`FetchResult`]: a body (or a readable failure) for one index, in flight
//! - [`ArticleRecord`]: a descriptor plus whatever body has arrived so far

use chrono::DateTime;

/// Optional publication details carried by a news sitemap entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleMetadata {
    /// Raw `news:publication_date`, usually RFC 3339.
    pub publication_date: Option<String>,
    /// `news:publication/news:name`
    pub source: Option<String>,
    /// `news:publication/news:language`
    pub language: Option<String>,
}

impl ArticleMetadata {
    /// True when the entry carried none of the optional fields.
    pub fn is_empty(&self) -> bool {
        self.publication_date.is_none() && self.source.is_none() && self.language.is_none()
    }

    /// Split the publication date into `(time, date)` display strings.
    ///
    /// The date keeps the offset it was published with. A date that is not
    /// RFC 3339 is returned verbatim as the date with an empty time.
    pub fn time_and_date(&self) -> (String, String) {
        match self.publication_date.as_deref() {
            None => (String::new(), String::new()),
            Some(raw) => match DateTime::parse_from_rfc3339(raw.trim()) {
                Ok(dt) => (
                    dt.format("%H:%M:%S").to_string(),
                    dt.format("%Y-%m-%d").to_string(),
                ),
                Err(_) => (String::new(), raw.trim().to_string()),
            },
        }
    }
}

/// A reference to one article, as listed in the feed index.
///
/// `index` is the entry's position in the capped list: 0-based and
/// contiguous. An empty `locator` is kept so that indices stay aligned with
/// the index document; the fetch pipeline skips it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDescriptor {
    pub index: usize,
    pub title: String,
    pub locator: String,
    pub metadata: ArticleMetadata,
}

/// How a body came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    /// Nothing has arrived for this article yet (or ever will, for blank locators).
    #[default]
    Pending,
    /// The body selector matched and the text was assembled.
    Loaded,
    /// The document was fetched but the body selector matched nothing.
    NoMatches,
    /// The document could not be fetched.
    Unavailable,
}

/// A body for one index, sent from a fetch task to the aggregator.
///
/// Failures travel as readable text in `text`; `status` only tells them apart
/// for counting and styling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub index: usize,
    pub text: String,
    pub status: FetchStatus,
}

impl FetchResult {
    pub fn loaded(index: usize, text: String) -> Self {
        Self {
            index,
            text,
            status: FetchStatus::Loaded,
        }
    }

    /// Diagnostic body for a document where the selector matched nothing.
    pub fn no_matches(index: usize, locator: &str, selector: &str) -> Self {
        Self {
            index,
            text: format!("error: {locator}: 0 results from \"{selector}\" (selector)"),
            status: FetchStatus::NoMatches,
        }
    }

    /// Placeholder body for a document that could not be fetched.
    pub fn unavailable(index: usize, reason: impl std::fmt::Display) -> Self {
        Self {
            index,
            text: format!("unavailable: {reason}"),
            status: FetchStatus::Unavailable,
        }
    }
}

/// A descriptor and the body fetched for it so far.
///
/// `body` stays empty while `status` is [`FetchStatus::Pending`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub descriptor: ArticleDescriptor,
    pub body: String,
    pub status: FetchStatus,
}

impl ArticleRecord {
    pub fn new(descriptor: ArticleDescriptor) -> Self {
        Self {
            descriptor,
            body: String::new(),
            status: FetchStatus::Pending,
        }
    }

    /// Line used for this article in the selection list.
    pub fn list_label(&self) -> String {
        format!("{:03}  {}", self.descriptor.index, self.descriptor.title)
    }

    /// Full text shown in the content pane: title, metadata line, then the
    /// body or a loading placeholder.
    ///
    /// The metadata labels carry inline style markers for the layout engine.
    pub fn display_text(&self) -> String {
        let mut text = self.descriptor.title.clone();
        let meta = &self.descriptor.metadata;
        if !meta.is_empty() {
            let (time, date) = meta.time_and_date();
            text.push_str(&format!(
                "\n[Time:](fg:green){}    [Date:](fg:green){}    [Source:](fg:green){}    [Language:](fg:green){}",
                time,
                date,
                meta.source.as_deref().unwrap_or_default(),
                meta.language.as_deref().unwrap_or_default(),
            ));
        }
        text.push_str("\n\n");
        if self.status == FetchStatus::Pending {
            text.push_str("Loading...");
        } else {
            text.push_str(&self.body);
        }
        text
    }
}
