use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("results at '{path}' in {context} is not a list")]
    MalformedResults { context: String, path: String },

    #[error("rate limited by {domain} (retry after {retry_after_secs:?}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: Option<u64>,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("failed to persist {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid endpoint URL \"{url}\": {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error(
        "gave up on page {page} of ({lat}, {lng}) after {attempts} attempts ({pages_written} pages written): {last_error}"
    )]
    RetriesExhausted {
        lat: f64,
        lng: f64,
        page: u32,
        attempts: u32,
        pages_written: u32,
        #[source]
        last_error: Box<ScraperError>,
    },
}
