use thiserror::Error;

/// Errors returned by the Google Sheets values client.
#[derive(Debug, Error)]
pub enum SheetsError {
    /// Network or TLS failure from the underlying HTTP client. The request
    /// URL is stripped before wrapping.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("request timed out: {context}")]
    Timeout { context: String },

    /// HTTP 429. `retry_after_secs` comes from the `Retry-After` header when present.
    #[error("rate limited by Sheets API (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("unexpected HTTP {status} from Sheets API: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Spreadsheet id or range that cannot be addressed.
    #[error("invalid sheet reference: {0}")]
    InvalidSheetRef(String),
}

impl From<reqwest::Error> for SheetsError {
    fn from(e: reqwest::Error) -> Self {
        SheetsError::Http(e.without_url())
    }
}
