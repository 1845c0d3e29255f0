//! Scrapers for the feed index and for article pages.
//!
//! Reading happens in two phases:
//!
//! 1. **Indexing** ([`sitemap`]): fetch the news sitemap and list its entries
//!    as [`crate::models::ArticleDescriptor`]s
//! 2. **Extraction** ([`article`]): pull the body text out of each fetched
//!    article page with the configured CSS selector
//!
//! Fetching itself lives in [`crate::fetch`]; dispatching the per-article
//! fetches lives in [`crate::pipeline`].

pub mod article;
pub mod sitemap;
