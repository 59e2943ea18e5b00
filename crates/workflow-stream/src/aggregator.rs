use serde_json::Value;
use tracing::{debug, warn};

use crate::event::{EventRecord, WorkflowEvent};
use crate::sink::{ErrorSink, TracingErrorSink};
use crate::summary::{RunReport, RunSummary, ToolResult, WorkflowError};

/// Folds event records into a `RunSummary`.
///
/// One aggregator serves exactly one stream; `finish` consumes it so the
/// summary cannot change after the stream ends.
pub struct EventAggregator {
    run_id: uuid::Uuid,
    summary: RunSummary,
    sink: Box<dyn ErrorSink>,
    seq: u64,
}

impl Default for EventAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl EventAggregator {
    /// Creates an aggregator that reports workflow errors through `tracing`.
    pub fn new() -> Self {
        Self::with_sink(TracingErrorSink)
    }

    /// Creates an aggregator that forwards workflow errors to `sink`.
    pub fn with_sink(sink: impl ErrorSink + 'static) -> Self {
        Self::with_boxed_sink(Box::new(sink))
    }

    pub(crate) fn with_boxed_sink(sink: Box<dyn ErrorSink>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4(),
            summary: RunSummary::default(),
            sink,
            seq: 0,
        }
    }

    /// Identifier attached to this aggregator's trace events.
    pub fn run_id(&self) -> uuid::Uuid {
        self.run_id
    }

    /// Read-only view of the state accumulated so far.
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Number of records applied so far.
    pub fn applied(&self) -> u64 {
        self.seq
    }

    pub fn apply(&mut self, record: &EventRecord) {
        let seq = self.seq;
        self.seq = self.seq.saturating_add(1);
        debug!(run_id = %self.run_id, seq, kind = %record.kind, "workflow event");

        match WorkflowEvent::from_record(record) {
            WorkflowEvent::Started => self.summary.started = true,
            WorkflowEvent::AiDelta { delta } => {
                if !delta.is_empty() {
                    self.summary.ai_text.push_str(&delta);
                }
            }
            WorkflowEvent::FinalOutput { content } => {
                self.summary.final_output = match content {
                    Value::Null => None,
                    content => Some(content),
                };
            }
            WorkflowEvent::ToolResult { tool_name, result } => {
                self.summary
                    .tool_results
                    .push(ToolResult { tool_name, result });
            }
            WorkflowEvent::Log { level, message } => {
                self.summary.logs.push(format!("[{level}] {message}"));
            }
            WorkflowEvent::Error { message, node_id } => {
                let err = WorkflowError { message, node_id };
                self.sink.workflow_error(&err);
                self.summary.errors.push(err);
            }
            WorkflowEvent::AllPathsCompleted => {
                if !self.summary.started {
                    warn!(run_id = %self.run_id, "completion event arrived before workflow_started");
                }
                self.summary.completed = true;
            }
            WorkflowEvent::Other { kind } => {
                debug!(run_id = %self.run_id, seq, kind = %kind, "ignoring unrecognized event kind");
            }
        }
    }

    /// Freezes the summary and derives the primary result and status.
    pub fn finish(self) -> RunReport {
        let report = RunReport::from(self.summary);
        debug!(
            run_id = %self.run_id,
            events = self.seq,
            status = ?report.status,
            tool_results = report.summary.tool_results.len(),
            logs = report.summary.logs.len(),
            errors = report.summary.errors.len(),
            "workflow stream finished"
        );
        report
    }
}

impl Extend<EventRecord> for EventAggregator {
    fn extend<T: IntoIterator<Item = EventRecord>>(&mut self, iter: T) {
        for record in iter {
            self.apply(&record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{PrimaryResult, RunStatus};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn record(value: serde_json::Value) -> EventRecord {
        EventRecord::parse(&value.to_string()).expect("record")
    }

    fn fold(values: Vec<serde_json::Value>) -> RunReport {
        let mut aggregator = EventAggregator::with_sink(|_: &WorkflowError| {});
        aggregator.extend(values.into_iter().map(record));
        aggregator.finish()
    }

    #[test]
    fn deltas_concatenate_in_order() {
        let report = fold(vec![
            json!({"type":"ai_delta","delta":"Hel"}),
            json!({"type":"ai_delta","delta":"lo, "}),
            json!({"type":"ai_delta"}),
            json!({"type":"ai_delta","delta":"world"}),
        ]);
        assert_eq!(report.summary.ai_text, "Hello, world");
        assert_eq!(
            report.primary,
            PrimaryResult::AssembledText("Hello, world".into())
        );
    }

    #[test]
    fn final_output_last_write_wins() {
        let report = fold(vec![
            json!({"type":"final_output","content":"A"}),
            json!({"type":"ai_delta","delta":"text"}),
            json!({"type":"final_output","content":{"b":true}}),
        ]);
        assert_eq!(report.summary.final_output, Some(json!({"b":true})));
        assert_eq!(report.primary, PrimaryResult::FinalOutput(json!({"b":true})));
    }

    #[test]
    fn null_final_output_clears_previous() {
        let report = fold(vec![
            json!({"type":"final_output","content":"A"}),
            json!({"type":"final_output","content":null}),
        ]);
        assert_eq!(report.summary.final_output, None);
        assert_eq!(report.primary, PrimaryResult::NoOutput);
    }

    #[test]
    fn tool_results_and_logs_append() {
        let report = fold(vec![
            json!({"type":"ai_tool_result","toolName":"search","result":{"hits":3}}),
            json!({"type":"workflow_log","level":"warn","message":"slow node"}),
            json!({"type":"ai_tool_result","toolName":"calc","result":7}),
            json!({"type":"workflow_log","message":"done"}),
        ]);
        assert_eq!(
            report.summary.tool_results,
            vec![
                ToolResult {
                    tool_name: "search".into(),
                    result: json!({"hits":3}),
                },
                ToolResult {
                    tool_name: "calc".into(),
                    result: json!(7),
                },
            ]
        );
        assert_eq!(report.summary.logs, vec!["[warn] slow node", "[info] done"]);
    }

    #[test]
    fn errors_reach_sink_immediately_and_are_kept() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = seen.clone();
        let mut aggregator = EventAggregator::with_sink(move |err: &WorkflowError| {
            sink_seen.lock().expect("lock").push(err.clone());
        });
        aggregator.apply(&record(json!({"type":"workflow_error","message":"boom","nodeId":"n7"})));
        assert_eq!(seen.lock().expect("lock").len(), 1);
        assert_eq!(aggregator.summary().errors.len(), 1);

        let report = aggregator.finish();
        assert_eq!(
            report.summary.errors,
            vec![WorkflowError {
                message: "boom".into(),
                node_id: Some("n7".into()),
            }]
        );
        assert_eq!(*seen.lock().expect("lock"), report.summary.errors);
    }

    #[test]
    fn lifecycle_flags_drive_status() {
        let completed = fold(vec![
            json!({"type":"workflow_started"}),
            json!({"type":"workflow_all_paths_completed"}),
        ]);
        assert_eq!(completed.status, RunStatus::Completed);

        let unconfirmed = fold(vec![json!({"type":"workflow_started"})]);
        assert_eq!(unconfirmed.status, RunStatus::Unconfirmed);

        let orphan_completion = fold(vec![json!({"type":"workflow_all_paths_completed"})]);
        assert!(orphan_completion.summary.completed);
        assert_eq!(orphan_completion.status, RunStatus::Unclear);
    }

    #[test]
    fn flags_stay_set_once_seen() {
        let report = fold(vec![
            json!({"type":"workflow_started"}),
            json!({"type":"workflow_all_paths_completed"}),
            json!({"type":"workflow_started"}),
            json!({"type":"ai_delta","delta":"late"}),
        ]);
        assert!(report.summary.started);
        assert!(report.summary.completed);
    }

    #[test]
    fn unknown_kinds_are_ignored() {
        let with_noise = fold(vec![
            json!({"type":"workflow_started"}),
            json!({"type":"node_progress","pct":50}),
            json!({"type":"ai_delta","delta":"x"}),
        ]);
        let clean = fold(vec![
            json!({"type":"workflow_started"}),
            json!({"type":"ai_delta","delta":"x"}),
        ]);
        assert_eq!(with_noise, clean);
    }

    #[test]
    fn empty_stream_reports_no_output() {
        let report = fold(Vec::new());
        assert_eq!(report.primary, PrimaryResult::NoOutput);
        assert_eq!(report.status, RunStatus::Unclear);
        assert_eq!(report.summary, RunSummary::default());
    }
}
