use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DatamartError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RETRIES: usize = 1;
const BACKOFF_BASE_MS: u64 = 1_000;

/// Envelope for single-resource responses: `{success, data, message?, errors?}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

/// Unwraps the standard envelope, raising on `success: false`.
pub fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<T, DatamartError> {
    if !envelope.success {
        return Err(DatamartError::ApiFailure(
            envelope
                .message
                .unwrap_or_else(|| "API request failed".to_string()),
        ));
    }
    Ok(envelope.data)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u32,
}

/// Envelope for collection responses: `{data, pagination}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// Query-string pairs. Absent and empty values are skipped; list values
/// repeat the key.
#[derive(Debug, Clone, Default)]
pub struct Query(Vec<(String, String)>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, key: &str, value: impl ToString) -> Self {
        let value = value.to_string();
        if !value.is_empty() {
            self.0.push((key.to_string(), value));
        }
        self
    }

    pub fn add_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.add(key, value),
            None => self,
        }
    }

    pub fn add_list<I, V>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        for value in values {
            self = self.add(key, value);
        }
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Blocking JSON client for the marketplace API.
///
/// Transport failures and 5xx statuses are retried with exponential backoff;
/// 4xx statuses and the final attempt are surfaced as typed errors.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    retries: usize,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, retries: usize) -> Result<Self, DatamartError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("datamart/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| DatamartError::ApiHttp(err.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| DatamartError::ApiHttp(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retries,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &Query) -> Result<T, DatamartError> {
        let url = self.url(endpoint);
        let response = self.send_with_retries(|| self.client.get(&url).query(query.pairs()))?;
        Self::decode(Self::handle_status(response)?)
    }

    /// Raw body fetch for file downloads.
    pub fn get_bytes(&self, endpoint: &str, query: &Query) -> Result<Vec<u8>, DatamartError> {
        let url = self.url(endpoint);
        let response = self.send_with_retries(|| self.client.get(&url).query(query.pairs()))?;
        let response = Self::handle_status(response)?;
        response
            .bytes()
            .map(|bytes| bytes.to_vec())
            .map_err(|err| DatamartError::ApiHttp(err.to_string()))
    }

    pub fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &impl Serialize,
    ) -> Result<T, DatamartError> {
        let url = self.url(endpoint);
        let response = self.send_with_retries(|| self.client.post(&url).json(body))?;
        Self::decode(Self::handle_status(response)?)
    }

    pub fn put<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &impl Serialize,
    ) -> Result<T, DatamartError> {
        let url = self.url(endpoint);
        let response = self.send_with_retries(|| self.client.put(&url).json(body))?;
        Self::decode(Self::handle_status(response)?)
    }

    pub fn delete(&self, endpoint: &str) -> Result<(), DatamartError> {
        let url = self.url(endpoint);
        let response = self.send_with_retries(|| self.client.delete(&url))?;
        Self::handle_status(response)?;
        Ok(())
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn send_with_retries<F>(&self, mut make_req: F) -> Result<Response, DatamartError>
    where
        F: FnMut() -> RequestBuilder,
    {
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < self.retries && is_retryable_status(status) {
                        let delay = BACKOFF_BASE_MS * (1 << attempt);
                        tracing::debug!(status, attempt, delay_ms = delay, "retrying request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < self.retries && is_retryable_error(&err) {
                        let delay = BACKOFF_BASE_MS * (1 << attempt);
                        tracing::debug!(error = %err, attempt, delay_ms = delay, "retrying request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(DatamartError::ApiHttp(err.to_string()));
                }
            }
        }
    }

    fn handle_status(response: Response) -> Result<Response, DatamartError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        let (code, message) = match serde_json::from_str::<Value>(&body) {
            Ok(parsed) => (
                parsed
                    .get("code")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                parsed
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("HTTP {status}")),
            ),
            Err(_) => {
                let trimmed = body.trim();
                let message = if trimmed.is_empty() {
                    format!("HTTP {status}")
                } else {
                    trimmed.to_string()
                };
                (None, message)
            }
        };
        Err(DatamartError::ApiStatus {
            status,
            code,
            message,
        })
    }

    fn decode<T: DeserializeOwned>(response: Response) -> Result<T, DatamartError> {
        response
            .json()
            .map_err(|err| DatamartError::ResponseParse(err.to_string()))
    }
}

fn is_retryable_status(status: u16) -> bool {
    (500..=599).contains(&status)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_unwraps_data() {
        let envelope = Envelope {
            data: 42,
            success: true,
            message: None,
            errors: None,
        };
        assert_eq!(unwrap_envelope(envelope).unwrap(), 42);
    }

    #[test]
    fn envelope_failure_carries_message() {
        let envelope = Envelope {
            data: (),
            success: false,
            message: Some("quota exceeded".to_string()),
            errors: None,
        };
        let err = unwrap_envelope(envelope).unwrap_err();
        assert_matches!(err, DatamartError::ApiFailure(message) if message == "quota exceeded");
    }

    #[test]
    fn query_skips_empty_and_repeats_lists() {
        let query = Query::new()
            .add("q", "customer data")
            .add("empty", "")
            .add_opt("page", None::<u32>)
            .add_opt("pageSize", Some(25))
            .add_list("tags", ["finance", "risk"]);
        assert_eq!(
            query.pairs(),
            &[
                ("q".to_string(), "customer data".to_string()),
                ("pageSize".to_string(), "25".to_string()),
                ("tags".to_string(), "finance".to_string()),
                ("tags".to_string(), "risk".to_string()),
            ]
        );
    }

    #[test]
    fn retryable_statuses_are_server_errors_only() {
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(429));
        assert!(!is_retryable_status(200));
    }

    #[test]
    fn page_envelope_deserializes() {
        let page: Page<Value> = serde_json::from_value(json!({
            "data": [{"id": "ds-1"}],
            "pagination": {"page": 1, "pageSize": 10, "totalCount": 1, "totalPages": 1}
        }))
        .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.pagination.total_pages, 1);
    }
}
