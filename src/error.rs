//! Error taxonomy for cullcss.
//!
//! A `thiserror`-derived enum covering the failure modes the library
//! surfaces: retrieving a page or stylesheet (`Fetch`), the optional
//! rendering collaborator (`Render`), URL parsing (`InvalidUrl`), and
//! invalid option combinations (`Config`). CSS/HTML parse problems are
//! never represented here — they degrade to a lenient fallback instead.

use thiserror::Error;

/// The library's unified error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Network or filesystem failure retrieving a page or stylesheet.
    #[error("failed to fetch {url}: {message}")]
    Fetch {
        /// The resource that could not be retrieved.
        url: String,
        /// Human-readable description of the failure.
        message: String,
    },

    /// Optional-renderer failure while producing a settled DOM.
    #[error("failed to render {url}: {message}")]
    Render {
        /// The resource being rendered.
        url: String,
        /// Human-readable description of the failure.
        message: String,
    },

    /// A URL could not be parsed.
    #[error("invalid url {input}")]
    InvalidUrl {
        /// The offending input string.
        input: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// Invalid combination of options, raised before any fetching begins.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Construct a [`Error::Fetch`] from a URL and message.
    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Construct a [`Error::Render`] from a URL and message.
    pub fn render(url: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Render {
            url: url.into(),
            message: message.into(),
        }
    }
}
