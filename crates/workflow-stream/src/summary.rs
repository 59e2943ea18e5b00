use std::fmt;

use serde_json::Value;

/// One captured `ai_tool_result` event.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub tool_name: String,
    pub result: Value,
}

/// One `workflow_error` event reported by the remote workflow.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowError {
    pub message: String,
    pub node_id: Option<String>,
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (NodeID: {})",
            self.message,
            self.node_id.as_deref().unwrap_or("N/A")
        )
    }
}

/// State accumulated from a workflow event stream.
///
/// Sequences are append-only in arrival order; `started` and `completed`
/// never go back to `false`.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub started: bool,
    pub completed: bool,
    pub ai_text: String,
    pub final_output: Option<Value>,
    pub tool_results: Vec<ToolResult>,
    pub logs: Vec<String>,
    pub errors: Vec<WorkflowError>,
}

impl RunSummary {
    /// Picks the result to show: final output, else assembled AI text, else nothing.
    pub fn primary_result(&self) -> PrimaryResult {
        if let Some(output) = self.final_output.as_ref().filter(|v| !is_blank(v)) {
            return PrimaryResult::FinalOutput(output.clone());
        }
        if !self.ai_text.is_empty() {
            return PrimaryResult::AssembledText(self.ai_text.clone());
        }
        PrimaryResult::NoOutput
    }

    pub fn status(&self) -> RunStatus {
        RunStatus::classify(self.started, self.completed)
    }
}

/// Values that count as "no final output": null, `false`, zero and `""`.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// The single result selected for display at the end of a run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum PrimaryResult {
    /// Content of the last `final_output` event.
    FinalOutput(Value),
    /// Concatenated `ai_delta` fragments.
    AssembledText(String),
    /// Neither a final output nor any AI text was captured.
    NoOutput,
}

impl PrimaryResult {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::NoOutput)
    }
}

/// Lifecycle classification derived from the started/completed flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Both `workflow_started` and `workflow_all_paths_completed` were seen.
    Completed,
    /// Started, but no completion event arrived.
    Unconfirmed,
    /// No start event arrived.
    Unclear,
}

impl RunStatus {
    pub fn classify(started: bool, completed: bool) -> Self {
        match (started, completed) {
            (true, true) => Self::Completed,
            (true, false) => Self::Unconfirmed,
            (false, _) => Self::Unclear,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Completed => "Workflow started and completed successfully.",
            Self::Unconfirmed => {
                "Workflow started but completion event was not explicitly captured in this summary."
            }
            Self::Unclear => "Workflow status unclear from captured events.",
        })
    }
}

/// Finished run: the frozen summary plus its derived values.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub summary: RunSummary,
    pub primary: PrimaryResult,
    pub status: RunStatus,
}

impl From<RunSummary> for RunReport {
    fn from(summary: RunSummary) -> Self {
        let primary = summary.primary_result();
        let status = summary.status();
        Self {
            summary,
            primary,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_classification_is_literal() {
        assert_eq!(RunStatus::classify(true, true), RunStatus::Completed);
        assert_eq!(RunStatus::classify(true, false), RunStatus::Unconfirmed);
        assert_eq!(RunStatus::classify(false, false), RunStatus::Unclear);
        assert_eq!(RunStatus::classify(false, true), RunStatus::Unclear);
    }

    #[test]
    fn primary_prefers_final_output() {
        let summary = RunSummary {
            ai_text: "draft".into(),
            final_output: Some(json!({"answer": 42})),
            ..RunSummary::default()
        };
        assert_eq!(
            summary.primary_result(),
            PrimaryResult::FinalOutput(json!({"answer": 42}))
        );
    }

    #[test]
    fn primary_falls_back_to_text_then_nothing() {
        let mut summary = RunSummary {
            ai_text: "Hello".into(),
            ..RunSummary::default()
        };
        assert_eq!(
            summary.primary_result(),
            PrimaryResult::AssembledText("Hello".into())
        );
        summary.ai_text.clear();
        assert_eq!(summary.primary_result(), PrimaryResult::NoOutput);
        assert!(summary.primary_result().is_empty());
    }

    #[test]
    fn blank_final_output_does_not_win() {
        let summary = RunSummary {
            ai_text: "text".into(),
            final_output: Some(json!("")),
            ..RunSummary::default()
        };
        assert_eq!(
            summary.primary_result(),
            PrimaryResult::AssembledText("text".into())
        );
    }

    #[test]
    fn zero_and_false_final_output_do_not_win() {
        for blank in [json!(0), json!(0.0), json!(false)] {
            let summary = RunSummary {
                ai_text: "text".into(),
                final_output: Some(blank.clone()),
                ..RunSummary::default()
            };
            assert_eq!(
                summary.primary_result(),
                PrimaryResult::AssembledText("text".into()),
                "{blank}"
            );
        }
        for kept in [json!(1), json!(true), json!([]), json!({})] {
            let summary = RunSummary {
                final_output: Some(kept.clone()),
                ..RunSummary::default()
            };
            assert_eq!(summary.primary_result(), PrimaryResult::FinalOutput(kept));
        }
    }

    #[test]
    fn error_display_uses_na_without_node() {
        let err = WorkflowError {
            message: "boom".into(),
            node_id: None,
        };
        assert_eq!(err.to_string(), "boom (NodeID: N/A)");
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = RunReport::from(RunSummary {
            started: true,
            tool_results: vec![ToolResult {
                tool_name: "search".into(),
                result: json!("ok"),
            }],
            ..RunSummary::default()
        });
        let value = serde_json::to_value(&report).expect("serialize");
        assert_eq!(value["status"], json!("unconfirmed"));
        assert_eq!(value["primary"], json!({"source": "no_output"}));
        assert_eq!(value["summary"]["toolResults"][0]["toolName"], json!("search"));
    }
}
