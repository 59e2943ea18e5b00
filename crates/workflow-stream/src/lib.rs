//! Incremental reader for remote workflow runs that report progress as a
//! server-sent event stream.
//!
//! Raw body chunks go through [`framer::StreamFramer`], which recovers event
//! blocks regardless of where chunk boundaries fall. Each record is folded by
//! [`aggregator::EventAggregator`] into a [`RunSummary`], which becomes a
//! [`RunReport`] once the stream ends.
//!
//! # Triggering a workflow
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use workflow_stream::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), TriggerError> {
//! let source = HttpEventSource::new(TriggerConfig::new(
//!     "https://www.visualworkflow.app/api/trigger/yourworkflowid",
//!     "yourapikey",
//! ))?;
//!
//! let outcome = WorkflowTrigger::new(Arc::new(source))
//!     .message("your input message")
//!     .error_sink(|err: &WorkflowError| eprintln!("Workflow Error Event: {err}"))
//!     .run()
//!     .await?;
//!
//! print!("{}", render_outcome(&outcome));
//! # Ok(())
//! # }
//! ```

/// Event folding and finalization.
pub mod aggregator;
/// Trigger configuration.
pub mod config;
/// Public error types.
pub mod errors;
/// Decoded event records and their typed view.
pub mod event;
/// Chunk-to-record framing for event-stream bodies.
pub mod framer;
/// Tracing subscriber setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Console rendering of finished runs.
pub mod render;
/// Stream consumption, cancellation, and the trigger builder.
pub mod run;
/// Side channel for workflow error events.
pub mod sink;
/// Transport seam and the HTTP implementation.
pub mod source;
/// Accumulated run state and derived results.
pub mod summary;

pub use aggregator::EventAggregator;
pub use config::TriggerConfig;
pub use errors::{Interruption, TransportError, TriggerError};
pub use event::{EventRecord, WorkflowEvent};
pub use framer::{StreamFramer, record_stream};
pub use render::{render_outcome, render_report};
pub use run::{AbortHandle, AbortSignal, RunOutcome, WorkflowTrigger, abort_pair, consume_stream};
pub use sink::{ErrorSink, TracingErrorSink};
pub use source::{ByteStream, EventSource, HttpEventSource};
pub use summary::{PrimaryResult, RunReport, RunStatus, RunSummary, ToolResult, WorkflowError};
