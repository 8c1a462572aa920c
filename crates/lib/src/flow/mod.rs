//! Flow backend abstraction and Langflow client.
//!
//! One `run` call per forwarded message; the response is arbitrary JSON handed to the
//! extractor untouched.

mod langflow;

pub use langflow::LangflowClient;

use async_trait::async_trait;
use serde_json::{Map, Value};

/// One flow execution request.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowRequest {
    pub message: String,
    /// Endpoint name or flow id (the last path segment of the run URL).
    pub endpoint: String,
    pub input_type: String,
    pub output_type: String,
    pub tweaks: Option<Map<String, Value>>,
    pub api_key: Option<String>,
}

impl FlowRequest {
    /// Request for `message` using the endpoint, types, tweaks and key from config.
    pub fn from_config(message: impl Into<String>, flow: &crate::config::FlowConfig) -> Self {
        Self {
            message: message.into(),
            endpoint: flow.target().to_string(),
            input_type: flow.input_type.clone(),
            output_type: flow.output_type.clone(),
            tweaks: flow.tweaks.clone(),
            api_key: flow.api_key.clone().filter(|k| !k.trim().is_empty()),
        }
    }

    /// JSON body for `/api/v1/run/{endpoint}`.
    pub fn body(&self) -> Value {
        let mut body = serde_json::json!({
            "input_value": self.message,
            "output_type": self.output_type,
            "input_type": self.input_type,
        });
        if let Some(ref tweaks) = self.tweaks {
            if !tweaks.is_empty() {
                body["tweaks"] = Value::Object(tweaks.clone());
            }
        }
        body
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("langflow unreachable: {0}")]
    Connect(#[source] reqwest::Error),
    #[error("langflow request timed out: {0}")]
    Timeout(#[source] reqwest::Error),
    #[error("langflow request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("langflow api error: {0}")]
    Api(String),
    #[error("{0}")]
    Parse(String),
}

impl From<reqwest::Error> for FlowError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            FlowError::Connect(e)
        } else if e.is_timeout() {
            FlowError::Timeout(e)
        } else {
            FlowError::Request(e)
        }
    }
}

/// Executes flows. Implemented by [`LangflowClient`]; tests substitute their own.
#[async_trait]
pub trait FlowBackend: Send + Sync {
    async fn run(&self, request: &FlowRequest) -> Result<Value, FlowError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlowConfig;
    use serde_json::json;

    #[test]
    fn body_omits_empty_tweaks() {
        let flow = FlowConfig {
            flow_id: "flow-1".to_string(),
            tweaks: Some(Map::new()),
            api_key: Some("  ".to_string()),
            ..FlowConfig::default()
        };
        let req = FlowRequest::from_config("Hello", &flow);
        assert_eq!(req.endpoint, "flow-1");
        assert_eq!(req.api_key, None);
        assert_eq!(
            req.body(),
            json!({ "input_value": "Hello", "output_type": "chat", "input_type": "chat" })
        );
    }

    #[test]
    fn body_includes_tweaks() {
        let mut tweaks = Map::new();
        tweaks.insert("ChatInput-EbPFZ".to_string(), json!({}));
        let flow = FlowConfig {
            endpoint: "assets".to_string(),
            tweaks: Some(tweaks),
            ..FlowConfig::default()
        };
        let req = FlowRequest::from_config("x", &flow);
        assert_eq!(req.endpoint, "assets");
        assert_eq!(req.body()["tweaks"], json!({ "ChatInput-EbPFZ": {} }));
    }
}
