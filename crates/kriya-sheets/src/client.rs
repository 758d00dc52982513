//! HTTP client for the Google Sheets v4 values API.
//!
//! Only `GET /v4/spreadsheets/{id}/values/{range}` with an API key is used;
//! spreadsheets must be shared as "anyone with the link can view".

use std::time::Duration;

use kriya_core::AppConfig;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::error::SheetsError;
use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_ERROR_BODY_CHARS: usize = 512;
/// The key travels in a header so it never appears in a URL that an error
/// message could echo.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Response envelope of the values endpoint. `values` is omitted entirely
/// when the range is empty.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Client for the Sheets values API.
///
/// Use [`SheetsClient::new`] for production or
/// [`SheetsClient::with_base_url`] to point at a mock server in tests.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    client: Client,
    api_key: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl SheetsClient {
    /// # Errors
    ///
    /// Returns [`SheetsError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, SheetsError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// Retries are off until [`SheetsClient::with_retry`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`SheetsError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`SheetsError::InvalidSheetRef`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, SheetsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("kriya/0.1 (catalog-import)")
            .build()?;

        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            SheetsError::InvalidSheetRef(format!("invalid base URL '{base_url}': {e}"))
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            max_retries: 0,
            backoff_base_ms: 0,
        })
    }

    /// Builds a client from application config. Returns `Ok(None)` when no
    /// API key is configured, meaning the importer is unavailable.
    ///
    /// # Errors
    ///
    /// Same as [`SheetsClient::with_base_url`].
    pub fn from_app_config(config: &AppConfig) -> Result<Option<Self>, SheetsError> {
        let Some(api_key) = config.sheets_api_key.as_deref() else {
            return Ok(None);
        };
        let timeout = if config.sheets_timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            config.sheets_timeout_secs
        };
        let client = Self::with_base_url(api_key, timeout, &config.sheets_base_url)?.with_retry(
            config.sheets_max_retries,
            config.sheets_retry_backoff_base_secs.saturating_mul(1_000),
        );
        Ok(Some(client))
    }

    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Fetches `range` (e.g. `Products!A2:I`) of spreadsheet `sheet_id` as
    /// rows of cell strings. Trailing empty cells are dropped by the API, so
    /// rows may be ragged.
    ///
    /// # Errors
    ///
    /// - [`SheetsError::InvalidSheetRef`] for an unusable id or range.
    /// - [`SheetsError::RateLimited`] / [`SheetsError::UnexpectedStatus`] for
    ///   non-2xx responses, after retries.
    /// - [`SheetsError::Timeout`] / [`SheetsError::Http`] on network failure.
    /// - [`SheetsError::Deserialize`] if the body is not a value range.
    pub async fn fetch_range(
        &self,
        sheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError> {
        let url = self.build_url(sheet_id, range)?;
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.request_values(&url, range)
        })
        .await
    }

    fn build_url(&self, sheet_id: &str, range: &str) -> Result<Url, SheetsError> {
        validate_sheet_id(sheet_id)?;
        if range.trim().is_empty() {
            return Err(SheetsError::InvalidSheetRef("empty range".to_string()));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SheetsError::InvalidSheetRef("base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", sheet_id, "values", range]);
        Ok(url)
    }

    async fn request_values(&self, url: &Url, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let response = self
            .client
            .get(url.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SheetsError::Timeout {
                        context: range.to_string(),
                    }
                } else {
                    SheetsError::from(e)
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(SheetsError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SheetsError::UnexpectedStatus {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let body = response.text().await?;
        let parsed: ValueRange =
            serde_json::from_str(&body).map_err(|e| SheetsError::Deserialize {
                context: range.to_string(),
                source: e,
            })?;

        Ok(parsed
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }
}

fn validate_sheet_id(sheet_id: &str) -> Result<(), SheetsError> {
    let valid = !sheet_id.is_empty()
        && sheet_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(SheetsError::InvalidSheetRef(format!(
            "spreadsheet id '{sheet_id}' must be non-empty [A-Za-z0-9_-]"
        )))
    }
}

fn cell_to_string(cell: serde_json::Value) -> String {
    match cell {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> SheetsClient {
        SheetsClient::with_base_url("test-key", 30, base_url)
            .expect("client construction should not fail")
    }

    #[test]
    fn build_url_places_range_in_path() {
        let client = test_client("https://sheets.googleapis.com");
        let url = client.build_url("abc123", "Products!A2:I").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/Products!A2:I"
        );
        assert!(url.query().is_none());
    }

    #[test]
    fn build_url_tolerates_trailing_slash() {
        let client = test_client("http://127.0.0.1:9999/");
        let url = client.build_url("abc", "Config!A2:B").unwrap();
        assert_eq!(url.path(), "/v4/spreadsheets/abc/values/Config!A2:B");
    }

    #[test]
    fn build_url_encodes_spaces_in_tab_names() {
        let client = test_client("https://sheets.googleapis.com");
        let url = client.build_url("abc", "My Products!A2:I").unwrap();
        assert!(url.path().ends_with("/values/My%20Products!A2:I"), "{url}");
    }

    #[test]
    fn rejects_path_traversal_in_sheet_id() {
        let client = test_client("https://sheets.googleapis.com");
        assert!(matches!(
            client.build_url("../secrets", "A1"),
            Err(SheetsError::InvalidSheetRef(_))
        ));
        assert!(client.build_url("", "A1").is_err());
    }

    #[tokio::test]
    async fn connection_errors_do_not_reveal_the_api_key() {
        let client = SheetsClient::with_base_url("SUPER-SECRET-KEY", 5, "http://127.0.0.1:1")
            .expect("client construction should not fail");

        let err = client
            .fetch_range("abc", "Categories!A2:D")
            .await
            .expect_err("nothing listens on port 1");

        let text = err.to_string();
        assert!(!text.contains("SUPER-SECRET-KEY"), "{text}");
        assert!(!format!("{err:?}").contains("SUPER-SECRET-KEY"));
    }

    #[test]
    fn non_string_cells_are_stringified() {
        assert_eq!(cell_to_string(serde_json::json!(45)), "45");
        assert_eq!(cell_to_string(serde_json::json!(true)), "true");
        assert_eq!(cell_to_string(serde_json::Value::Null), "");
        assert_eq!(cell_to_string(serde_json::json!("x")), "x");
    }
}
