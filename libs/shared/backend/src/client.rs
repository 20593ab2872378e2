use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::BackendError;

pub type QueryParams = Vec<(&'static str, String)>;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// JSON client for the platform's REST backend.
///
/// Every call forwards the dashboard user's bearer token. A non-2xx reply is
/// turned into a [`BackendError`]; there is no retry.
#[derive(Clone, Debug)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &AppConfig) -> Result<Self, BackendError> {
        if config.backend_api_url.is_empty() {
            return Err(BackendError::NotConfigured);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.backend_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.backend_api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        query: Option<&QueryParams>,
        body: Option<Value>,
    ) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let request_id = Uuid::new_v4().to_string();
        debug!("Making {} request to {} ({})", method, url, request_id);

        let mut req = self
            .client
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json")
            .header(REQUEST_ID_HEADER, &request_id);

        if let Some(token) = auth_token {
            req = req.bearer_auth(token);
        }
        if let Some(params) = query {
            req = req.query(params);
        }
        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}) for {}: {}", status, url, error_text);
            return Err(BackendError::from_status(status.as_u16(), error_text));
        }

        let bytes = response.bytes().await?;
        // Mutation endpoints may answer 204 or an empty 200.
        let payload: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &bytes
        };

        serde_json::from_slice(payload).map_err(|e| BackendError::Decode(e.to_string()))
    }

    pub async fn get<T>(
        &self,
        path: &str,
        auth_token: &str,
        query: &QueryParams,
    ) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, path, Some(auth_token), Some(query), None)
            .await
    }

    pub async fn put(&self, path: &str, auth_token: &str, body: Option<Value>) -> Result<Value, BackendError> {
        self.request(Method::PUT, path, Some(auth_token), None, body)
            .await
    }

    pub async fn post(&self, path: &str, auth_token: &str, body: Value) -> Result<Value, BackendError> {
        self.request(Method::POST, path, Some(auth_token), None, Some(body))
            .await
    }
}

/// Percent-encodes an id for use as a single path segment.
pub fn encode_segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_new_requires_base_url() {
        assert_matches!(BackendClient::new(&AppConfig::default()), Err(BackendError::NotConfigured));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let config = AppConfig {
            backend_api_url: "http://backend/".to_string(),
            ..AppConfig::default()
        };
        let client = BackendClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://backend");
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("a/b c"), "a%2Fb%20c");
    }
}
