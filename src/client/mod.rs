//! Typed wrapper over the REST API, used by internal tools and integration
//! tests. One attempt per call; failures map to [`ApiError`] and are never
//! retried here.

pub mod paths;
mod resources;

use std::collections::HashMap;
use std::sync::Mutex;

use reqwest::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

pub use resources::ExportDownload;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response; carries the HTTP status and the server's `message`.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    cache: Mutex<HashMap<String, Value>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
            token,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
        self.clear_cache();
    }

    pub fn clear_cache(&self) {
        self.cache
            .lock()
            .expect("client cache poisoned")
            .clear();
    }

    /// Cache-keyed read: a hit returns the cached body without touching the
    /// network; the next read after an invalidation refetches. Also the
    /// escape hatch for endpoints without a typed wrapper.
    ///
    /// The cache holds one entry per distinct path and never evicts on its
    /// own; long-lived clients iterating many filter combinations should call
    /// [`clear_cache`](Self::clear_cache) between batches.
    pub async fn get_cached(&self, path: &str) -> Result<Value, ApiError> {
        if let Some(hit) = self
            .cache
            .lock()
            .expect("client cache poisoned")
            .get(path)
            .cloned()
        {
            return Ok(hit);
        }

        let value = self
            .request(Method::GET, path, None)
            .await?
            .unwrap_or(Value::Null);
        self.cache
            .lock()
            .expect("client cache poisoned")
            .insert(path.to_string(), value.clone());
        Ok(value)
    }

    /// Drops every cached read under the given path prefix.
    pub(crate) fn invalidate(&self, scope: &str) {
        self.cache
            .lock()
            .expect("client cache poisoned")
            .retain(|key, _| !key.starts_with(scope));
    }

    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self
            .http
            .request(method, url)
            .header("content-type", "application/json");
        if let Some(token) = self.token.as_ref() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let bytes = response.bytes().await?;
        if status.is_success() {
            if bytes.is_empty() {
                return Ok(None);
            }
            let value = serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
            return Ok(Some(value));
        }

        Err(error_from_response(status, &bytes))
    }

    pub(crate) async fn request_bytes(
        &self,
        path: &str,
    ) -> Result<(reqwest::header::HeaderMap, Vec<u8>), ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.get(url);
        if let Some(token) = self.token.as_ref() {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(error_from_response(status, &bytes));
        }
        Ok((headers, bytes.to_vec()))
    }
}

fn error_from_response(status: StatusCode, body: &[u8]) -> ApiError {
    let message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(|message| message.as_str())
                .map(|message| message.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    ApiError::Http {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_slash_from_base_url() {
        let client = ApiClient::new("https://api.example.com/api/", None);
        assert_eq!(client.base_url(), "https://api.example.com/api");

        let client = ApiClient::new("https://api.example.com/api", None);
        assert_eq!(client.base_url(), "https://api.example.com/api");
    }

    #[test]
    fn error_uses_server_message_when_parsable() {
        let err = error_from_response(StatusCode::BAD_REQUEST, br#"{"message":"name must not be empty"}"#);
        match err {
            ApiError::Http { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "name must not be empty");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn error_falls_back_to_status_text_for_unparsable_body() {
        let err = error_from_response(StatusCode::INTERNAL_SERVER_ERROR, b"<html>boom</html>");
        match err {
            ApiError::Http { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal Server Error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn error_falls_back_when_message_field_is_missing() {
        let err = error_from_response(StatusCode::NOT_FOUND, br#"{"detail":"nope"}"#);
        match err {
            ApiError::Http { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Not Found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
