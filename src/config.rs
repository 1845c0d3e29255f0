//! Runtime settings.
//!
//! Settings come from three layers, highest precedence first:
//! 1. command-line flags and their environment variables ([`Cli`])
//! 2. an optional YAML file
//! 3. the defaults below
//!
//! ```yaml
//! feed_url: https://www.hindustantimes.com/sitemap/today
//! body_selector: ".storyDetail > p"
//! max_articles: 186
//! pacing:
//!   batch_size: 16
//!   interval_ms: 2000
//! max_in_flight: 32
//! channel_capacity: 16
//! content_width_cap: 80
//! clipboard_command: [xclip, -selection, clipboard]
//! ```

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::pipeline::PacingPolicy;
use crate::scrapers::article::BodySelector;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;
use url::Url;

pub const DEFAULT_FEED_URL: &str = "https://www.hindustantimes.com/sitemap/today";
pub const DEFAULT_BODY_SELECTOR: &str = ".storyDetail > p";

/// Dispatch pacing as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PacingSettings {
    pub batch_size: usize,
    pub interval_ms: u64,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            batch_size: 16,
            interval_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub feed_url: String,
    pub body_selector: String,
    pub max_articles: usize,
    pub pacing: PacingSettings,
    /// Concurrent network fetches.
    pub max_in_flight: usize,
    /// Results buffered between fetch tasks and the aggregator.
    pub channel_capacity: usize,
    /// Widest the article text is wrapped to, in columns.
    pub content_width_cap: u16,
    pub request_timeout_secs: u64,
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
    pub user_agent: String,
    /// Program and arguments that read the clipboard text from stdin.
    pub clipboard_command: Vec<String>,
    pub log_file: Option<String>,
    /// Redraw interval while waiting for input, in milliseconds.
    pub tick_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            body_selector: DEFAULT_BODY_SELECTOR.to_string(),
            max_articles: 186,
            pacing: PacingSettings::default(),
            max_in_flight: 32,
            channel_capacity: 16,
            content_width_cap: 80,
            request_timeout_secs: 20,
            max_retries: 2,
            retry_base_delay_ms: 500,
            user_agent: format!("awful_news_reader/{}", env!("CARGO_PKG_VERSION")),
            clipboard_command: vec![
                "xclip".to_string(),
                "-selection".to_string(),
                "clipboard".to_string(),
            ],
            log_file: None,
            tick_ms: 250,
        }
    }
}

impl Settings {
    /// Parse settings from YAML text. Missing keys take their defaults.
    pub fn from_yaml(yaml: &str, path: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Override settings with whatever was given on the command line.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(v) = &cli.feed_url {
            self.feed_url = v.clone();
        }
        if let Some(v) = &cli.selector {
            self.body_selector = v.clone();
        }
        if let Some(v) = cli.max_articles {
            self.max_articles = v;
        }
        if let Some(v) = cli.pacing_batch {
            self.pacing.batch_size = v;
        }
        if let Some(v) = cli.pacing_interval_ms {
            self.pacing.interval_ms = v;
        }
        if let Some(v) = cli.max_in_flight {
            self.max_in_flight = v;
        }
        if let Some(v) = cli.width_cap {
            self.content_width_cap = v;
        }
        if let Some(v) = &cli.log_file {
            self.log_file = Some(v.clone());
        }
    }

    /// Check every setting that could only fail later, at a worse time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |key: &'static str, value: usize| {
            if value == 0 {
                Err(ConfigError::Invalid {
                    key,
                    message: "must be greater than zero".to_string(),
                })
            } else {
                Ok(())
            }
        };
        positive("max_articles", self.max_articles)?;
        positive("channel_capacity", self.channel_capacity)?;
        positive("max_in_flight", self.max_in_flight)?;
        positive("content_width_cap", usize::from(self.content_width_cap))?;

        if self.clipboard_command.first().is_none_or(|p| p.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                key: "clipboard_command",
                message: "must name a program".to_string(),
            });
        }

        self.feed_url()?;
        self.body_selector()?;
        Ok(())
    }

    pub fn feed_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.feed_url).map_err(|source| ConfigError::FeedUrl {
            url: self.feed_url.clone(),
            source,
        })
    }

    pub fn body_selector(&self) -> Result<BodySelector, ConfigError> {
        BodySelector::parse(&self.body_selector)
    }

    pub fn pacing_policy(&self) -> PacingPolicy {
        PacingPolicy::new(self.pacing.batch_size, Duration::from_millis(self.pacing.interval_ms))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(10))
    }
}

/// Load settings from the optional config file, apply CLI overrides, validate.
#[instrument(level = "info", skip_all, fields(config = ?cli.config))]
pub fn load_settings(cli: &Cli) -> Result<Settings, ConfigError> {
    let mut settings = match &cli.config {
        Some(path) => {
            let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            Settings::from_yaml(&yaml, path)?
        }
        None => Settings::default(),
    };
    settings.apply_cli(cli);
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.max_articles, 186);
        assert_eq!(settings.pacing_policy(), PacingPolicy::new(16, Duration::from_secs(2)));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
max_articles: 20
pacing:
  interval_ms: 500
"#;
        let settings = Settings::from_yaml(yaml, "config.yaml").unwrap();
        assert_eq!(settings.max_articles, 20);
        assert_eq!(settings.pacing.batch_size, 16);
        assert_eq!(settings.pacing.interval_ms, 500);
        assert_eq!(settings.body_selector, DEFAULT_BODY_SELECTOR);
    }

    #[test]
    fn test_unknown_yaml_key_is_rejected() {
        let err = Settings::from_yaml("max_article: 20\n", "config.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut settings = Settings::from_yaml("max_articles: 20\n", "config.yaml").unwrap();
        let cli = Cli::parse_from(["awful_news_reader", "-n", "5", "-s", "article p"]);
        settings.apply_cli(&cli);
        assert_eq!(settings.max_articles, 5);
        assert_eq!(settings.body_selector, "article p");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let settings = Settings {
            max_articles: 0,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid { key: "max_articles", .. })
        ));

        let settings = Settings {
            feed_url: "not a url".to_string(),
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::FeedUrl { .. })));

        let settings = Settings {
            body_selector: "p[".to_string(),
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::Selector { .. })));

        let settings = Settings {
            clipboard_command: vec![],
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid { key: "clipboard_command", .. })
        ));
    }

    #[test]
    fn test_load_settings_missing_file() {
        let cli = Cli::parse_from(["awful_news_reader", "-c", "/nonexistent/config.yaml"]);
        assert!(matches!(load_settings(&cli), Err(ConfigError::Read { .. })));
    }
}
