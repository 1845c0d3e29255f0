//! Command-line interface definitions.
//!
//! Every option can also be provided through an environment variable. Options
//! left unset fall back to the YAML config file, then to built-in defaults
//! (see [`crate::config::Settings`]).

use clap::Parser;

/// Command-line arguments for the news reader.
///
/// # Examples
///
/// ```sh
/// # Read today's default sitemap
/// awful_news_reader
///
/// # Another site, fewer articles, logs to a file
/// awful_news_reader -f https://example.com/sitemap/today -s "article p" -n 50 -l reader.log
///
/// # Settings from a YAML file
/// awful_news_reader -c ~/.config/awful_news_reader/config.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long, env = "NEWS_READER_CONFIG")]
    pub config: Option<String>,

    /// News sitemap URL to index
    #[arg(short, long, env = "NEWS_FEED_URL")]
    pub feed_url: Option<String>,

    /// CSS selector matching the article body paragraphs
    #[arg(short, long, env = "NEWS_BODY_SELECTOR")]
    pub selector: Option<String>,

    /// Maximum number of articles to list
    #[arg(short = 'n', long, env = "NEWS_MAX_ARTICLES")]
    pub max_articles: Option<usize>,

    /// Pause dispatch after every N-th article
    #[arg(long, env = "NEWS_PACING_BATCH")]
    pub pacing_batch: Option<usize>,

    /// Length of each dispatch pause, in milliseconds
    #[arg(long, env = "NEWS_PACING_INTERVAL_MS")]
    pub pacing_interval_ms: Option<u64>,

    /// Maximum concurrent article fetches
    #[arg(long, env = "NEWS_MAX_IN_FLIGHT")]
    pub max_in_flight: Option<usize>,

    /// Maximum width of wrapped article text, in columns
    #[arg(short, long, env = "NEWS_WIDTH_CAP")]
    pub width_cap: Option<u16>,

    /// Append logs to this file (logs are discarded otherwise)
    #[arg(short, long, env = "NEWS_READER_LOG")]
    pub log_file: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_are_unset() {
        let cli = Cli::parse_from(["awful_news_reader"]);
        assert!(cli.feed_url.is_none());
        assert!(cli.selector.is_none());
        assert!(cli.max_articles.is_none());
    }

    #[test]
    fn test_cli_long_flags() {
        let cli = Cli::parse_from([
            "awful_news_reader",
            "--feed-url",
            "https://example.com/sitemap.xml",
            "--selector",
            "article p",
            "--max-articles",
            "50",
            "--pacing-interval-ms",
            "500",
        ]);

        assert_eq!(cli.feed_url.as_deref(), Some("https://example.com/sitemap.xml"));
        assert_eq!(cli.selector.as_deref(), Some("article p"));
        assert_eq!(cli.max_articles, Some(50));
        assert_eq!(cli.pacing_interval_ms, Some(500));
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "awful_news_reader",
            "-c",
            "/tmp/config.yaml",
            "-n",
            "10",
            "-w",
            "72",
            "-l",
            "/tmp/reader.log",
        ]);

        assert_eq!(cli.config.as_deref(), Some("/tmp/config.yaml"));
        assert_eq!(cli.max_articles, Some(10));
        assert_eq!(cli.width_cap, Some(72));
        assert_eq!(cli.log_file.as_deref(), Some("/tmp/reader.log"));
    }
}
