use std::pin::Pin;

use bytes::Bytes;
use futures::StreamExt as _;
use tracing::debug;

use crate::config::TriggerConfig;
use crate::errors::{TransportError, TriggerError};

/// Response body as a stream of raw chunks.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<Bytes, TransportError>> + Send + 'static>>;

/// Transport that starts a workflow run and hands back its event-stream body.
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    /// Triggers the workflow with `payload` and returns the response body.
    async fn open(&self, payload: serde_json::Value) -> Result<ByteStream, TriggerError>;
}

/// `EventSource` backed by an HTTP POST to the workflow trigger endpoint.
pub struct HttpEventSource {
    client: reqwest::Client,
    config: TriggerConfig,
}

impl HttpEventSource {
    pub fn new(config: TriggerConfig) -> Result<Self, TriggerError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.idle_timeout)
            .read_timeout(config.idle_timeout)
            .build()
            .map_err(|e| TriggerError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a source from `WORKFLOW_*` environment variables.
    pub fn from_env() -> Result<Self, TriggerError> {
        Self::new(TriggerConfig::from_env()?)
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl EventSource for HttpEventSource {
    async fn open(&self, payload: serde_json::Value) -> Result<ByteStream, TriggerError> {
        debug!(endpoint = %self.config.endpoint, "triggering workflow");
        let response = self
            .client
            .post(&self.config.endpoint)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header("X-API-Key", &self.config.api_key)
            .json(&request_body(payload))
            .send()
            .await
            .map_err(|e| TriggerError::Request(format!("workflow request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TriggerError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!(%status, "workflow accepted, streaming events");

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::new(e.to_string())));
        Ok(Box::pin(stream))
    }
}

/// Wraps the caller's payload in the trigger envelope.
pub(crate) fn request_body(payload: serde_json::Value) -> serde_json::Value {
    serde_json::json!({ "payload": payload })
}
