use tracing::error;

use crate::summary::WorkflowError;

/// Receives `workflow_error` events as soon as they are folded, ahead of the
/// final report.
pub trait ErrorSink: Send {
    fn workflow_error(&mut self, error: &WorkflowError);
}

impl<F> ErrorSink for F
where
    F: FnMut(&WorkflowError) + Send,
{
    fn workflow_error(&mut self, error: &WorkflowError) {
        self(error)
    }
}

/// Default sink: reports each error through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn workflow_error(&mut self, err: &WorkflowError) {
        error!(
            node_id = err.node_id.as_deref().unwrap_or("N/A"),
            "workflow error event: {}", err.message
        );
    }
}
