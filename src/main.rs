//! # Awful News Reader
//!
//! A terminal reader for a news site's daily sitemap. It indexes the sitemap,
//! fetches every article body in the background, and lets you page through
//! the articles while they arrive.
//!
//! ## Usage
//!
//! ```sh
//! awful_news_reader -l /tmp/reader.log
//! ```
//!
//! ## Architecture
//!
//! 1. **Indexing**: fetch the sitemap and list up to `max_articles` entries.
//!    Failure here is fatal.
//! 2. **Fetching**: a paced dispatcher spawns one task per article, bounded by
//!    a semaphore. Each task sends its extracted body (or a placeholder) down
//!    a bounded channel.
//! 3. **Aggregation**: a single task drains the channel into the shared
//!    [`store::ArticleStore`].
//! 4. **Viewing**: the terminal viewer reads the store on a blocking thread
//!    until the user quits, then everything is cancelled and joined.

use clap::Parser;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod clipboard;
mod config;
mod error;
mod fetch;
mod models;
mod pipeline;
mod scrapers;
mod stats;
mod store;
mod ui;
mod utils;

use cli::Cli;
use clipboard::CommandClipboard;
use fetch::{HttpFetcher, RetryFetch};
use pipeline::FetchPipeline;
use utils::open_log_file;

/// Log to `log_file` when given. The viewer owns the terminal, so logs are
/// discarded otherwise.
fn init_tracing(log_file: Option<&str>) -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let writer = match log_file {
        Some(path) => BoxMakeWriter::new(Mutex::new(open_log_file(path)?)),
        None => BoxMakeWriter::new(std::io::sink),
    };
    tfmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();
    Ok(())
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();
    let settings = config::load_settings(&args)?;
    init_tracing(settings.log_file.as_deref())?;

    let start_time = std::time::Instant::now();
    info!(
        feed_url = %settings.feed_url,
        body_selector = %settings.body_selector,
        max_articles = settings.max_articles,
        "awful_news_reader starting up"
    );

    let feed_url = settings.feed_url()?;
    let selector = settings.body_selector()?;
    let clipboard = CommandClipboard::new(&settings.clipboard_command)?;
    let http = HttpFetcher::new(settings.request_timeout(), &settings.user_agent)?;
    let fetcher = Arc::new(RetryFetch::new(
        http,
        settings.max_retries,
        settings.retry_base_delay(),
    ));

    // ---- Index ----
    let descriptors =
        match scrapers::sitemap::index_articles(fetcher.as_ref(), &feed_url, settings.max_articles).await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                error!(error = %e, url = %feed_url, "Failed to load the article index");
                return Err(e.into());
            }
        };
    info!(count = descriptors.len(), "Indexed articles");

    // ---- Fetch and aggregate in the background ----
    let store = Arc::new(store::ArticleStore::new(descriptors.clone()));
    let (tx, rx) = mpsc::channel(settings.channel_capacity);
    let cancel = CancellationToken::new();

    let aggregator = tokio::spawn(store::aggregate(rx, Arc::clone(&store)));
    let pipeline = FetchPipeline::new(
        Arc::clone(&fetcher),
        selector,
        settings.pacing_policy(),
        settings.max_in_flight,
        cancel.clone(),
    );
    let dispatcher = tokio::spawn(pipeline.run(descriptors, tx));

    // ---- View ----
    let ui_store = Arc::clone(&store);
    let ui_settings = settings.clone();
    let viewer = tokio::task::spawn_blocking(move || ui::run(ui_store, &ui_settings, &clipboard)).await;

    // ---- Shutdown ----
    cancel.cancel();
    let report = dispatcher.await?;
    let summary = aggregator.await?;

    let elapsed = start_time.elapsed();
    info!(
        dispatched = report.dispatched,
        skipped = report.skipped,
        pauses = report.pauses,
        cancelled = report.cancelled,
        received = summary.received,
        loaded = summary.loaded,
        unavailable = summary.unavailable,
        no_matches = summary.no_matches,
        out_of_range = summary.out_of_range,
        elapsed_secs = elapsed.as_secs_f64(),
        "awful_news_reader finished"
    );

    viewer??;
    Ok(())
}
