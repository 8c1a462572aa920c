//! Langflow API client (http://localhost:7860 by default).
//! POST /api/v1/run/{endpoint} with the chat input; the JSON reply is returned as-is.

use super::{FlowBackend, FlowError, FlowRequest};
use crate::config::{FlowConfig, HttpConfig};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Client for the Langflow run API.
#[derive(Clone)]
pub struct LangflowClient {
    base_url: String,
    client: reqwest::Client,
}

impl LangflowClient {
    /// Client for `config.base_url`, bounded by `config.timeout_secs` and honoring
    /// `http.verify_ssl`.
    pub fn new(config: &FlowConfig, http: &HttpConfig) -> Result<Self, FlowError> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let client = crate::http::build_client(http.verify_ssl, Some(timeout))
            .map_err(FlowError::Request)?;
        Ok(Self::with_client(&config.base_url, client))
    }

    pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Full run URL for an endpoint name or flow id.
    pub fn run_url(&self, endpoint: &str) -> String {
        format!("{}/api/v1/run/{}", self.base_url, endpoint)
    }
}

#[async_trait]
impl FlowBackend for LangflowClient {
    async fn run(&self, request: &FlowRequest) -> Result<Value, FlowError> {
        let url = self.run_url(&request.endpoint);
        log::debug!("flow: POST {}", url);
        let mut req = self.client.post(&url).json(&request.body());
        if let Some(ref key) = request.api_key {
            req = req.header("x-api-key", key);
        }
        let res = req.send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(FlowError::Api(format!("{} {}", status, body)));
        }
        let text = res.text().await?;
        serde_json::from_str(&text).map_err(|e| FlowError::Parse(e.to_string()))
    }
}
