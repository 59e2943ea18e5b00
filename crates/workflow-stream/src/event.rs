use serde_json::{Map, Value};

/// One decoded block of the event stream.
///
/// `kind` is the payload's `type` field; `payload` is the full JSON object,
/// `type` included.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EventRecord {
    pub kind: String,
    pub payload: Map<String, Value>,
}

impl EventRecord {
    /// Parses a block payload. Returns `None` for anything that is not a JSON
    /// object with a string `type` field.
    pub fn parse(data: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(data).ok()?;
        let Value::Object(payload) = value else {
            return None;
        };
        let kind = payload.get("type")?.as_str()?.to_owned();
        Some(Self { kind, payload })
    }

    pub(crate) fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }

    pub(crate) fn value_field(&self, key: &str) -> Value {
        self.payload.get(key).cloned().unwrap_or(Value::Null)
    }
}

/// Typed view of an `EventRecord`, one variant per kind the aggregator acts on.
#[derive(Clone, Debug, PartialEq)]
pub enum WorkflowEvent {
    Started,
    AiDelta {
        delta: String,
    },
    FinalOutput {
        content: Value,
    },
    ToolResult {
        tool_name: String,
        result: Value,
    },
    Log {
        level: String,
        message: String,
    },
    Error {
        message: String,
        node_id: Option<String>,
    },
    AllPathsCompleted,
    /// Any kind this crate does not recognize.
    Other {
        kind: String,
    },
}

impl WorkflowEvent {
    pub fn from_record(record: &EventRecord) -> Self {
        match record.kind.as_str() {
            "workflow_started" => Self::Started,
            "ai_delta" => Self::AiDelta {
                delta: record.str_field("delta").unwrap_or_default().to_owned(),
            },
            "final_output" => Self::FinalOutput {
                content: record.value_field("content"),
            },
            "ai_tool_result" => Self::ToolResult {
                tool_name: record.str_field("toolName").unwrap_or_default().to_owned(),
                result: record.value_field("result"),
            },
            "workflow_log" => Self::Log {
                level: record
                    .str_field("level")
                    .filter(|level| !level.is_empty())
                    .unwrap_or("info")
                    .to_owned(),
                message: record.str_field("message").unwrap_or_default().to_owned(),
            },
            "workflow_error" => Self::Error {
                message: record.str_field("message").unwrap_or_default().to_owned(),
                node_id: record
                    .str_field("nodeId")
                    .filter(|id| !id.is_empty())
                    .map(ToOwned::to_owned),
            },
            "workflow_all_paths_completed" => Self::AllPathsCompleted,
            other => Self::Other {
                kind: other.to_owned(),
            },
        }
    }
}

impl From<&EventRecord> for WorkflowEvent {
    fn from(record: &EventRecord) -> Self {
        Self::from_record(record)
    }
}
