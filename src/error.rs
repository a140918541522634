use std::sync::Arc;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum RequestsError {
    /// Target or proxy address is not a valid absolute URL.
    #[error("invalid url '{url}': {source}")]
    UrlParse {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// Structured request body could not be encoded as JSON.
    #[error("serialize error: {0}")]
    Serialize(#[source] serde_json::Error),
    /// Form fields could not be URL-encoded.
    #[error("form encode error: {0}")]
    FormEncode(#[source] serde_urlencoded::ser::Error),
    /// Response body is not valid for the requested decode.
    #[error("deserialize error: {0}")]
    Deserialize(#[source] serde_json::Error),
    /// Stream read or file-system failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Draining the response body failed. Cached, so shared.
    #[error("failed to read response body: {0}")]
    ReadBody(#[source] Arc<reqwest::Error>),
    /// `set_proxy` was called with an empty address.
    #[error("proxy is empty")]
    EmptyProxy,
    /// Method token rejected while building the request.
    #[error("invalid method: {0}")]
    InvalidMethod(#[from] http::method::InvalidMethod),
    /// Header name rejected while building the request.
    #[error("invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),
    /// Header value rejected while building the request.
    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    /// The underlying `reqwest::Client` could not be built.
    #[error("failed to build http client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// The attempt was cancelled through its cancellation token.
    #[error("request cancelled")]
    Cancelled,
    /// Malformed configuration value.
    #[error("config error: {0}")]
    Config(String),
}

impl RequestsError {
    /// Returns `true` for errors produced by a round trip.
    ///
    /// Build-time failures (URL, method, headers, body encoding) are never
    /// retried; only these are.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Io(_) | Self::Cancelled)
    }

    pub(crate) fn url_parse(url: &str, source: url::ParseError) -> Self {
        Self::UrlParse {
            url: url.to_owned(),
            source,
        }
    }
}
