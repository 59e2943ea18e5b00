use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt as _;
use tokio::sync::watch;
use tracing::{Instrument as _, debug, warn};

use crate::aggregator::EventAggregator;
use crate::errors::{Interruption, TransportError, TriggerError};
use crate::framer::record_stream;
use crate::observability::run_span;
use crate::sink::{ErrorSink, TracingErrorSink};
use crate::source::EventSource;
use crate::summary::RunReport;

/// Result of consuming one workflow stream.
///
/// `report` always holds everything aggregated before the stream stopped.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RunOutcome {
    pub report: RunReport,
    pub interruption: Option<Interruption>,
}

impl RunOutcome {
    /// True when the stream ran to end-of-stream.
    pub fn is_complete(&self) -> bool {
        self.interruption.is_none()
    }
}

/// Handle used to request cancellation of a running stream.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// A request still waiting for response headers is dropped; a stream
    /// being consumed stops before the next chunk. Either way the run returns
    /// the partial report with `Interruption::Cancelled`.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Receiving side of an `AbortHandle`.
pub struct AbortSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl AbortSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_aborted(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    fn is_armed(&self) -> bool {
        self.rx.is_some()
    }

    /// Resolves `true` once abort is requested, or `false` (disarming the
    /// signal) when every handle has been dropped.
    async fn aborted(&mut self) -> bool {
        let Some(rx) = self.rx.as_mut() else {
            return false;
        };
        loop {
            if *rx.borrow_and_update() {
                return true;
            }
            if rx.changed().await.is_err() {
                self.rx = None;
                return false;
            }
        }
    }
}

/// Creates a connected abort handle and signal.
pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx }, AbortSignal { rx: Some(rx) })
}

/// Drives a raw event-stream body through the framer and `aggregator`.
///
/// Consumption stops at end-of-stream, on a read error, or when `abort` fires;
/// in every case the report holds all events folded up to that point.
pub async fn consume_stream<S>(
    bytes: S,
    mut aggregator: EventAggregator,
    mut abort: AbortSignal,
) -> RunOutcome
where
    S: futures::Stream<Item = Result<Bytes, TransportError>> + Send + Unpin,
{
    let span = run_span(aggregator.run_id());
    async move {
        let mut records = std::pin::pin!(record_stream(bytes));
        let interruption = loop {
            tokio::select! {
                biased;
                aborted = abort.aborted(), if abort.is_armed() => {
                    if aborted {
                        debug!("workflow stream aborted by caller");
                        break Some(Interruption::Cancelled);
                    }
                }
                next = records.next() => {
                    match next {
                        Some(Ok(record)) => aggregator.apply(&record),
                        Some(Err(err)) => {
                            warn!(error = %err, "workflow stream interrupted");
                            break Some(Interruption::Transport(err));
                        }
                        None => break None,
                    }
                }
            }
        };

        RunOutcome {
            report: aggregator.finish(),
            interruption,
        }
    }
    .instrument(span)
    .await
}

/// Builder for triggering one workflow run and summarizing its stream.
pub struct WorkflowTrigger {
    source: Arc<dyn EventSource>,
    payload: Option<serde_json::Value>,
    sink: Box<dyn ErrorSink>,
    abort_handle: AbortHandle,
    abort: AbortSignal,
}

impl WorkflowTrigger {
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        let (abort_handle, abort) = abort_pair();
        Self {
            source,
            payload: None,
            sink: Box::new(TracingErrorSink),
            abort_handle,
            abort,
        }
    }

    /// Sets the payload sent under the `payload` key of the request body.
    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Shorthand for a `{"message": text}` payload.
    pub fn message(self, text: impl Into<String>) -> Self {
        self.payload(serde_json::json!({ "message": text.into() }))
    }

    /// Receives `workflow_error` events as they arrive.
    pub fn error_sink(mut self, sink: impl ErrorSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Returns a handle that can cancel the run.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Triggers the workflow and consumes its stream to the end.
    ///
    /// Errors are returned only when no stream could be opened; anything that
    /// happens after that is reported through `RunOutcome`.
    pub async fn run(self) -> Result<RunOutcome, TriggerError> {
        let payload = validate_payload(self.payload)?;
        let aggregator = EventAggregator::with_boxed_sink(self.sink);
        let mut abort = self.abort;
        if abort.is_aborted() {
            return Ok(cancelled(aggregator));
        }
        let bytes = tokio::select! {
            biased;
            true = abort.aborted(), if abort.is_armed() => {
                debug!(run_id = %aggregator.run_id(), "workflow trigger aborted before the stream opened");
                return Ok(cancelled(aggregator));
            }
            opened = self.source.open(payload) => opened?,
        };
        Ok(consume_stream(bytes, aggregator, abort).await)
    }
}

fn cancelled(aggregator: EventAggregator) -> RunOutcome {
    RunOutcome {
        report: aggregator.finish(),
        interruption: Some(Interruption::Cancelled),
    }
}

fn validate_payload(payload: Option<serde_json::Value>) -> Result<serde_json::Value, TriggerError> {
    let Some(payload) = payload else {
        return Err(TriggerError::Validation("a payload is required".into()));
    };
    if let Some(message) = payload.get("message").and_then(|v| v.as_str())
        && message.trim().is_empty()
    {
        return Err(TriggerError::Validation("message must not be empty".into()));
    }
    Ok(payload)
}
