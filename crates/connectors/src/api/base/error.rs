use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-retryable HTTP status on a page-level request.
    #[error("HTTP {status} from {url}: {body}")]
    PermanentHttp { status: u16, url: String, body: String },

    #[error("Malformed page from {url}: {reason}")]
    MalformedPage { url: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Extraction strategy '{strategy}' is not supported for origin '{origin}'")]
    UnsupportedStrategy { origin: String, strategy: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

impl ApiError {
    pub fn malformed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        ApiError::MalformedPage {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
