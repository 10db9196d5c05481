use thiserror::Error;

/// Errors returned by the Apify API client.
#[derive(Debug, Error)]
pub enum ApifyError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Apify API returned a non-2xx response with an error body.
    #[error("Apify API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The scraper run reached a terminal state other than `SUCCEEDED`.
    #[error("scraper run finished with status {0}")]
    RunFailed(String),

    /// The run did not reach a terminal state within the configured bound.
    #[error("scraper run did not finish within {secs}s")]
    Timeout { secs: u64 },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
