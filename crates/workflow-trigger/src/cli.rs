use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use workflow_stream::TriggerConfig;

/// Command-line options. Flags override `WORKFLOW_*` environment variables
/// (a `.env` file in the working directory is loaded first).
#[derive(Debug, Parser)]
#[command(name = "workflow-trigger", version, about = "Trigger a workflow and summarize its event stream")]
pub struct Cli {
    /// Trigger URL (defaults to WORKFLOW_ENDPOINT).
    #[arg(long)]
    pub endpoint: Option<String>,

    /// API key sent as X-API-Key (defaults to WORKFLOW_API_KEY).
    #[arg(long)]
    pub api_key: Option<String>,

    /// Message sent as `{"message": ...}` in the payload.
    #[arg(long, short, conflicts_with = "payload")]
    pub message: Option<String>,

    /// Raw JSON payload, sent as-is under the `payload` key.
    #[arg(long)]
    pub payload: Option<String>,

    /// Seconds to wait for the connection or for the next chunk of the
    /// stream (defaults to WORKFLOW_IDLE_TIMEOUT_SECS or 300).
    #[arg(long)]
    pub idle_timeout_secs: Option<u64>,

    /// Print the run outcome as JSON instead of the console summary.
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn config(&self) -> anyhow::Result<TriggerConfig> {
        let mut config = TriggerConfig::env_defaults()?;
        if let Some(endpoint) = &self.endpoint {
            config = config.endpoint(endpoint);
        }
        if let Some(api_key) = &self.api_key {
            config = config.api_key(api_key);
        }
        if let Some(secs) = self.idle_timeout_secs {
            config = config.idle_timeout(Duration::from_secs(secs));
        }
        config.validate()?;
        Ok(config)
    }

    pub fn payload(&self) -> anyhow::Result<serde_json::Value> {
        if let Some(raw) = &self.payload {
            return serde_json::from_str(raw).context("--payload must be valid JSON");
        }
        let message = self
            .message
            .as_deref()
            .context("either --message or --payload is required")?;
        Ok(serde_json::json!({ "message": message }))
    }
}
