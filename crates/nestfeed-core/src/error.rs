use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned HTTP {status} for URL: {url}")]
    Api { status: u16, url: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The data source answered with a response that breaks its own contract
    #[error("Response contract violation: {0}")]
    Contract(String),

    /// A cache resolver failed; every caller coalesced onto the same key sees this
    #[error("Resolver for '{key}' failed: {source}")]
    Resolver { key: String, source: Arc<Error> },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for failures that a later identical request might not hit again
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(_) => true,
            Error::Api { status, .. } => *status == 429 || *status >= 500,
            Error::Resolver { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let server = Error::Api { status: 503, url: "http://x".into() };
        let missing = Error::Api { status: 404, url: "http://x".into() };
        assert!(server.is_transient());
        assert!(!missing.is_transient());
        assert!(!Error::Contract("bad".into()).is_transient());

        let wrapped = Error::Resolver {
            key: "listing-images:1".into(),
            source: Arc::new(server),
        };
        assert!(wrapped.is_transient());
    }

    #[test]
    fn test_resolver_message_names_key() {
        let err = Error::Resolver {
            key: "listing-images:42".into(),
            source: Arc::new(Error::Other("boom".into())),
        };
        assert_eq!(err.to_string(), "Resolver for 'listing-images:42' failed: boom");
    }
}
