use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

/// JSON-over-REST client for a hosted realtime database.
///
/// Every node is addressed as `{base_url}/{segment}/.../{segment}.json`; reads of an absent node
/// return `null` rather than an error.
pub struct RealtimeDatabaseClient {
    client: Client,
    base_url: String,
    secret: String,
}

impl RealtimeDatabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_base_url(&config.database_url, &config.database_secret)
    }

    pub fn with_base_url(base_url: &str, secret: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            secret: secret.to_string(),
        }
    }

    fn get_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Builds the `.json` URL for a node path. Segments are percent-encoded individually.
    pub fn node_url(&self, segments: &[&str]) -> String {
        let path = segments
            .iter()
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}.json", self.base_url, path)
    }

    pub async fn request<T>(&self, method: Method, segments: &[&str], body: Option<&Value>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.node_url(segments);
        debug!("Making {} request to {}", method, url);

        let mut req = self.client.request(method, &url).headers(self.get_headers());

        if !self.secret.is_empty() {
            req = req.query(&[("auth", self.secret.as_str())]);
        }

        if let Some(body_data) = body {
            req = req.json(body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Realtime database error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    pub async fn get<T>(&self, segments: &[&str]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, segments, None).await
    }

    pub async fn put(&self, segments: &[&str], body: &Value) -> Result<Value> {
        self.request(Method::PUT, segments, Some(body)).await
    }

    pub async fn patch(&self, segments: &[&str], body: &Value) -> Result<Value> {
        self.request(Method::PATCH, segments, Some(body)).await
    }

    pub async fn delete(&self, segments: &[&str]) -> Result<()> {
        let _: Value = self.request(Method::DELETE, segments, None).await?;
        Ok(())
    }
}
