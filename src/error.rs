//! Error types for the news reader.
//!
//! Errors are split by how far they are allowed to travel:
//! - [`ConfigError`] and [`LoadError`] stop the process before the viewer starts
//! - [`FetchError`] belongs to a single article and is folded into that
//!   article's body text by the fetch pipeline
//! - [`ClipboardError`] is shown as a transient notice in the footer

use thiserror::Error;

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The YAML config file could not be read
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path of the config file
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The YAML config file is not valid for [`crate::config::Settings`]
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path of the config file
        path: String,
        /// Underlying YAML error
        #[source]
        source: serde_yaml::Error,
    },

    /// The body selector is not a valid CSS selector
    #[error("invalid body selector {selector:?}: {message}")]
    Selector {
        /// The selector as configured
        selector: String,
        /// Parser message
        message: String,
    },

    /// The feed URL does not parse
    #[error("invalid feed url {url:?}: {source}")]
    FeedUrl {
        /// The URL as configured
        url: String,
        /// Underlying parse error
        #[source]
        source: url::ParseError,
    },

    /// A numeric or list setting is out of its allowed range
    #[error("invalid setting {key}: {message}")]
    Invalid {
        /// Setting name as it appears in the YAML file
        key: &'static str,
        /// What is wrong with it
        message: String,
    },
}

/// Failure to fetch a single document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The server answered with a non-success status
    #[error("{url}: server returned status {status}")]
    Http {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Connection, TLS, timeout or body read failure
    #[error("{url}: {message}")]
    Transport {
        /// Requested URL
        url: String,
        /// Transport error message
        message: String,
    },

    /// The response is not a document that can be parsed as text
    #[error("{url}: malformed document: {message}")]
    Parse {
        /// Requested URL
        url: String,
        /// Parser message
        message: String,
    },

    /// The fetch was abandoned because the viewer is shutting down
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether a retry has a chance of succeeding.
    ///
    /// Transport failures, `429 Too Many Requests` and server errors are
    /// retried; everything else is final.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Http { status, .. } => *status == 429 || *status >= 500,
            FetchError::Parse { .. } | FetchError::Cancelled => false,
        }
    }
}

/// Failure to build the article list from the feed index. Always fatal.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The index document could not be fetched
    #[error("failed to fetch feed index: {0}")]
    Fetch(#[from] FetchError),

    /// The index document is not well-formed XML
    #[error("feed index is not valid XML: {0}")]
    Xml(String),

    /// The index document has no entries for the entry element
    #[error("feed index has no <{selector}> entries")]
    EmptyResult {
        /// Entry element that was searched for
        selector: &'static str,
    },

    /// An entry's title is missing its CDATA envelope
    #[error("entry {index} has a malformed title (expected a CDATA envelope): {raw:?}")]
    MalformedTitle {
        /// Position of the entry in the index document
        index: usize,
        /// Title content as found
        raw: String,
    },
}

/// Failure to hand text to the system clipboard.
#[derive(Debug, Error)]
pub enum ClipboardError {
    /// The configured clipboard command is empty
    #[error("no clipboard command configured")]
    NoCommand,

    /// The clipboard program could not be started
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program name
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Writing to or waiting on the clipboard program failed
    #[error("clipboard I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The clipboard program exited unsuccessfully
    #[error("{program} exited with {status}")]
    NonZeroExit {
        /// Program name
        program: String,
        /// Exit status as reported by the OS
        status: std::process::ExitStatus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let transport = FetchError::Transport {
            url: "https://example.com".into(),
            message: "connection reset".into(),
        };
        assert!(transport.is_transient());

        for status in [429, 500, 502, 503] {
            let err = FetchError::Http { url: "u".into(), status };
            assert!(err.is_transient(), "status {status} should be retried");
        }
        for status in [400, 403, 404, 410] {
            let err = FetchError::Http { url: "u".into(), status };
            assert!(!err.is_transient(), "status {status} should not be retried");
        }
        assert!(!FetchError::Cancelled.is_transient());
    }

    #[test]
    fn test_error_messages_cite_url() {
        let err = FetchError::Http {
            url: "https://example.com/a".into(),
            status: 404,
        };
        assert_eq!(err.to_string(), "https://example.com/a: server returned status 404");

        let err = LoadError::EmptyResult { selector: "url" };
        assert_eq!(err.to_string(), "feed index has no <url> entries");
    }
}
