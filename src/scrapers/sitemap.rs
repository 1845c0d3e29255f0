//! News sitemap indexer.
//!
//! Reads a Google News sitemap and turns its `<url>` entries into
//! [`ArticleDescriptor`]s, in document order, keeping the first
//! `max_articles` of them.
//!
//! # Entry Shape
//!
//! ```xml
//! <url>
//!   <loc>https://www.example.com/india-news/story-101.html</loc>
//!   <news:news>
//!     <news:publication>
//!       <news:name>Example Times</news:name>
//!       <news:language>en</news:language>
//!     </news:publication>
//!     <news:publication_date>2025-06-01T14:05:09+05:30</news:publication_date>
//!     <news:title><![CDATA[Monsoon arrives early]]></news:title>
//!   </news:news>
//! </url>
//! ```
//!
//! Titles must arrive in a CDATA envelope. The envelope is taken from the XML
//! structure when possible; titles whose envelope was flattened into text or
//! into a comment (`<!--[CDATA[...]]-->`) are unwrapped by their markers, and a
//! title with no envelope at all fails the load with
//! [`LoadError::MalformedTitle`].

use crate::error::LoadError;
use crate::fetch::FetchDocument;
use crate::models::{ArticleDescriptor, ArticleMetadata};
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Element that delimits one entry in the sitemap.
pub const ENTRY_ELEMENT: &str = "url";

/// Known `(prefix, suffix)` pairs around a title.
const CDATA_ENVELOPES: [(&str, &str); 2] = [("<![CDATA[", "]]>"), ("<!--[CDATA[", "]]-->")];

/// Fetch the sitemap at `feed_url` and index its entries.
///
/// # Errors
///
/// Any [`LoadError`]; all of them are fatal for the run.
#[instrument(level = "info", skip(fetcher), fields(feed_url = %feed_url))]
pub async fn index_articles<F>(
    fetcher: &F,
    feed_url: &Url,
    max_articles: usize,
) -> Result<Vec<ArticleDescriptor>, LoadError>
where
    F: FetchDocument,
{
    let xml = fetcher.fetch(feed_url.as_str()).await?;
    debug!(bytes = xml.len(), "Fetched sitemap");
    parse_sitemap(&xml, Some(feed_url), max_articles)
}

/// Strip a known CDATA envelope from `raw`, or `None` if it has none.
pub fn strip_cdata(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    CDATA_ENVELOPES.iter().find_map(|(prefix, suffix)| {
        raw.strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(suffix))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Loc,
    Title,
    PublicationDate,
    Source,
    Language,
}

impl Field {
    fn from_path(name: &str, parent: Option<&str>) -> Option<Self> {
        match (parent, name) {
            (Some("url"), "loc") => Some(Field::Loc),
            (Some("news"), "title") => Some(Field::Title),
            (Some("news"), "publication_date") => Some(Field::PublicationDate),
            (Some("publication"), "name") => Some(Field::Source),
            (Some("publication"), "language") => Some(Field::Language),
            _ => None,
        }
    }
}

/// Fields of one `<url>` entry as found in the document, still escaped.
#[derive(Debug, Default)]
struct RawEntry {
    loc: String,
    title_cdata: Option<String>,
    title_text: String,
    publication_date: Option<String>,
    source: Option<String>,
    language: Option<String>,
}

impl RawEntry {
    fn into_descriptor(self, index: usize, base: Option<&Url>) -> Result<ArticleDescriptor, LoadError> {
        let title = match self.title_cdata {
            Some(cdata) => cdata.trim().to_string(),
            None => {
                let text = unescape(&self.title_text)?;
                strip_cdata(&text)
                    .map(|t| t.trim().to_string())
                    .ok_or_else(|| LoadError::MalformedTitle {
                        index,
                        raw: text.trim().to_string(),
                    })?
            }
        };

        let loc = unescape(&self.loc)?;
        let locator = resolve_locator(loc.trim(), base);

        let optional = |raw: Option<String>| -> Result<Option<String>, LoadError> {
            match raw {
                None => Ok(None),
                Some(r) => {
                    let value = unescape(&r)?.trim().to_string();
                    Ok((!value.is_empty()).then_some(value))
                }
            }
        };

        Ok(ArticleDescriptor {
            index,
            title,
            locator,
            metadata: ArticleMetadata {
                publication_date: optional(self.publication_date)?,
                source: optional(self.source)?,
                language: optional(self.language)?,
            },
        })
    }

    fn push_text(&mut self, field: Field, raw: &str) {
        let slot = match field {
            Field::Loc => &mut self.loc,
            Field::Title => &mut self.title_text,
            Field::PublicationDate => self.publication_date.get_or_insert_with(String::new),
            Field::Source => self.source.get_or_insert_with(String::new),
            Field::Language => self.language.get_or_insert_with(String::new),
        };
        slot.push_str(raw);
    }
}

fn unescape(raw: &str) -> Result<String, LoadError> {
    quick_xml::escape::unescape(raw)
        .map(|s| s.into_owned())
        .map_err(|e| LoadError::Xml(e.to_string()))
}

fn resolve_locator(loc: &str, base: Option<&Url>) -> String {
    if loc.is_empty() {
        return String::new();
    }
    let resolved = match base {
        Some(base) => base.join(loc),
        None => Url::parse(loc),
    };
    match resolved {
        Ok(url) => url.to_string(),
        Err(e) => {
            warn!(%loc, error = %e, "Could not resolve article locator; keeping it verbatim");
            loc.to_string()
        }
    }
}

/// Parse sitemap XML into at most `max_articles` descriptors.
///
/// Every entry is scanned (so the total can be logged) but only the first
/// `max_articles` become descriptors. Relative `<loc>` values are resolved
/// against `base` when given.
pub fn parse_sitemap(
    xml: &str,
    base: Option<&Url>,
    max_articles: usize,
) -> Result<Vec<ArticleDescriptor>, LoadError> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<String> = Vec::new();
    let mut entry: Option<RawEntry> = None;
    let mut field: Option<(Field, usize)> = None;
    let mut entries_seen = 0usize;
    let mut descriptors = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            LoadError::Xml(format!("at byte {}: {e}", reader.buffer_position()))
        })?;

        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if name == ENTRY_ELEMENT {
                    entries_seen += 1;
                    entry = Some(RawEntry::default());
                    field = None;
                } else if entry.is_some() && field.is_none() {
                    if let Some(f) = Field::from_path(&name, stack.last().map(String::as_str)) {
                        field = Some((f, stack.len() + 1));
                    }
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == ENTRY_ELEMENT.as_bytes() {
                    entries_seen += 1;
                    if entries_seen <= max_articles {
                        descriptors.push(RawEntry::default().into_descriptor(entries_seen - 1, base)?);
                    }
                }
            }
            Event::End(_) => {
                let depth = stack.len();
                let closed = stack.pop();
                if field.is_some_and(|(_, d)| d == depth) {
                    field = None;
                }
                if closed.as_deref() == Some(ENTRY_ELEMENT) {
                    if let Some(raw) = entry.take() {
                        if entries_seen <= max_articles {
                            descriptors.push(raw.into_descriptor(entries_seen - 1, base)?);
                        }
                    }
                }
            }
            Event::Text(t) => {
                if let (Some(raw), Some((f, _))) = (entry.as_mut(), field) {
                    raw.push_text(f, &String::from_utf8_lossy(&t));
                }
            }
            Event::GeneralRef(r) => {
                if let (Some(raw), Some((f, _))) = (entry.as_mut(), field) {
                    raw.push_text(f, &format!("&{};", String::from_utf8_lossy(&r)));
                }
            }
            Event::CData(c) => {
                if let (Some(raw), Some((f, _))) = (entry.as_mut(), field) {
                    let content = String::from_utf8_lossy(&c).into_owned();
                    match f {
                        Field::Title => raw.title_cdata.get_or_insert_with(String::new).push_str(&content),
                        // CDATA content is literal; escape it so the final unescape restores it
                        _ => raw.push_text(f, &quick_xml::escape::escape(content.as_str())),
                    }
                }
            }
            Event::Comment(c) => {
                if let (Some(raw), Some((Field::Title, _))) = (entry.as_mut(), field) {
                    let content = String::from_utf8_lossy(&c);
                    raw.title_text.push_str(&format!("<!--{content}-->"));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if entries_seen == 0 {
        return Err(LoadError::EmptyResult {
            selector: ENTRY_ELEMENT,
        });
    }

    info!(
        total = entries_seen,
        retained = descriptors.len(),
        max_articles,
        "Indexed sitemap entries"
    );
    Ok(descriptors)
}
