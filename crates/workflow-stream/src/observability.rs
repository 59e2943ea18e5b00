//! Process-wide tracing setup and the per-run span.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_FILTER: &str = "warn";
const DEFAULT_LOG_FILE: &str = "workflow-stream.logs.jsonl";

/// Logging settings read from the environment.
///
/// - `WORKFLOW_OBSERVABILITY_ENABLED`: `0`/`false`/`off` disables tracing.
/// - `WORKFLOW_LOG_LEVEL`, then `RUST_LOG`: filter directives (default `warn`).
/// - `WORKFLOW_JSON_LOG_PATH`: write JSONL there instead of compact stderr.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSettings {
    pub enabled: bool,
    pub filter: String,
    pub json_path: Option<PathBuf>,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = lookup("WORKFLOW_OBSERVABILITY_ENABLED")
            .and_then(|v| parse_switch(&v))
            .unwrap_or(true);
        let filter = ["WORKFLOW_LOG_LEVEL", "RUST_LOG"]
            .into_iter()
            .filter_map(&lookup)
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty() && tracing_subscriber::EnvFilter::try_new(v).is_ok())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let json_path = lookup("WORKFLOW_JSON_LOG_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        Self {
            enabled,
            filter,
            json_path,
        }
    }

    /// Splits `json_path` into the directory and file name the appender wants.
    fn json_target(&self) -> Option<(PathBuf, String)> {
        let path = self.json_path.as_deref()?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_LOG_FILE);
        Some((dir.to_path_buf(), file.to_string()))
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Installs the global subscriber from `LogSettings::from_env`, once per process.
///
/// Console output goes to stderr so stdout only carries the run summary.
pub fn init_observability() {
    INIT.get_or_init(|| install(&LogSettings::from_env()));
}

fn install(settings: &LogSettings) {
    if !settings.enabled {
        return;
    }
    let filter = tracing_subscriber::EnvFilter::new(&settings.filter);
    match settings.json_target() {
        Some((dir, file)) => {
            let _ = std::fs::create_dir_all(&dir);
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(false)
                .with_writer(tracing_appender::rolling::never(dir, file));
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .try_init();
        }
        None => {
            let console_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(console_layer)
                .try_init();
        }
    }
}

/// Span wrapping the consumption of one workflow stream.
pub fn run_span(run_id: uuid::Uuid) -> tracing::Span {
    tracing::info_span!("workflow_run", run_id = %run_id)
}
