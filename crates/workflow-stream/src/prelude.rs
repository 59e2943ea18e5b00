//! Common imports for triggering a workflow and reading its report.
pub use crate::{
    AbortHandle, ErrorSink, EventAggregator, EventSource, HttpEventSource, Interruption,
    PrimaryResult, RunOutcome, RunReport, RunStatus, RunSummary, TriggerConfig, TriggerError,
    WorkflowError, WorkflowTrigger, render_outcome, render_report,
};
