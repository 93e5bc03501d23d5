//! HTTP client for the spreadsheet values-append API.
//!
//! Credential acquisition happens elsewhere; this client only carries a
//! bearer access token.

use crate::sink::{RowAppender, TransportError};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";
/// Range the append is anchored at. The API appends after the last row of the
/// table found there.
pub const DEFAULT_RANGE: &str = "sheet!A1";

#[derive(Serialize)]
struct ValueRange<'a> {
    range: &'a str,
    values: Vec<Vec<String>>,
}

/// Spreadsheet append client.
pub struct SheetsClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    range: String,
}

impl SheetsClient {
    /// Build from access token + optional base URL override.
    pub fn new(access_token: String, base_url: Option<String>) -> Self {
        let base = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        Self {
            client: reqwest::Client::new(),
            base_url: base.trim_end_matches('/').to_owned(),
            access_token,
            range: DEFAULT_RANGE.to_owned(),
        }
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = range.into();
        self
    }

    fn endpoint(&self, sheet_id: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}:append",
            self.base_url, sheet_id, self.range
        )
    }

    async fn append(&self, sheet_id: &str, values: Vec<String>) -> Result<(), TransportError> {
        let body = ValueRange { range: &self.range, values: vec![values] };

        let resp = self
            .client
            .post(self.endpoint(sheet_id))
            .bearer_auth(&self.access_token)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
                ("includeValuesInResponse", "false"),
                ("responseValueRenderOption", "FORMATTED_VALUE"),
            ])
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(check_error(status, text));
        }

        tracing::debug!(sheet_id, "row appended");
        Ok(())
    }
}

/// Map a non-success response onto the transport taxonomy.
fn check_error(status: reqwest::StatusCode, body: String) -> TransportError {
    match status.as_u16() {
        401 | 403 => TransportError::Unauthorized(format!("{status}: {body}")),
        429 => TransportError::RateLimited,
        _ => TransportError::RequestFailed(format!("{status}: {body}")),
    }
}

impl RowAppender for SheetsClient {
    fn name(&self) -> &str {
        "sheets"
    }

    fn append_row(
        &self,
        sheet_id: &str,
        values: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>> {
        let sheet_id = sheet_id.to_owned();
        Box::pin(async move { self.append(&sheet_id, values).await })
    }
}

/// Build a client from environment variables.
/// Reads `SMART_CHARGING_SHEETS_TOKEN`, optionally `SMART_CHARGING_SHEETS_BASE_URL`.
/// Returns `None` if the token is not set.
pub fn from_env() -> Option<SheetsClient> {
    let token = std::env::var("SMART_CHARGING_SHEETS_TOKEN").ok()?;
    if token.trim().is_empty() {
        return None;
    }
    let base_url = std::env::var("SMART_CHARGING_SHEETS_BASE_URL").ok();
    Some(SheetsClient::new(token, base_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint() {
        let c = SheetsClient::new("tok".into(), None);
        assert_eq!(
            c.endpoint("abc123"),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/sheet!A1:append"
        );
        assert_eq!(c.name(), "sheets");
    }

    #[test]
    fn custom_base_url_and_range() {
        let c = SheetsClient::new("tok".into(), Some("http://localhost:8080/".into()))
            .with_range("log!A1");
        assert_eq!(
            c.endpoint("id"),
            "http://localhost:8080/v4/spreadsheets/id/values/log!A1:append"
        );
    }

    #[test]
    fn auth_failures_are_unauthorized() {
        let e = check_error(reqwest::StatusCode::UNAUTHORIZED, "bad token".into());
        assert!(matches!(e, TransportError::Unauthorized(_)));
        let e = check_error(reqwest::StatusCode::FORBIDDEN, String::new());
        assert!(matches!(e, TransportError::Unauthorized(_)));
    }

    #[test]
    fn quota_is_rate_limited() {
        let e = check_error(reqwest::StatusCode::TOO_MANY_REQUESTS, String::new());
        assert_eq!(e, TransportError::RateLimited);
    }

    #[test]
    fn server_error_is_request_failed() {
        let e = check_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom".into());
        assert_eq!(e, TransportError::RequestFailed("500 Internal Server Error: boom".into()));
    }

    #[test]
    fn body_shape() {
        let body = ValueRange { range: "sheet!A1", values: vec![vec!["t".into()]] };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"range": "sheet!A1", "values": [["t"]]}));
    }
}
