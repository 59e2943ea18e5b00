//! Trigger a remote workflow and print a summary of its event stream.

mod cli;

use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser as _;
use workflow_stream::observability::init_observability;
use workflow_stream::prelude::*;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_observability();
    let cli = Cli::parse();

    let config = cli.config()?;
    let payload = cli.payload()?;
    if !cli.json {
        println!("Calling workflow API: {}", config.endpoint);
    }

    let source = HttpEventSource::new(config).context("invalid workflow configuration")?;
    let trigger = WorkflowTrigger::new(Arc::new(source))
        .payload(payload)
        .error_sink(|err: &WorkflowError| eprintln!("   Workflow Error Event: {err}"));

    let abort = trigger.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping stream");
            abort.abort();
        }
    });

    let outcome = match trigger.run().await {
        Ok(outcome) => outcome,
        Err(TriggerError::Status { status, body }) => {
            eprintln!("Error: {status}");
            eprintln!("Server response: {body}");
            anyhow::bail!("workflow service rejected the request");
        }
        Err(err) => return Err(err).context("Request failed"),
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("failed to serialize run outcome")?
        );
    } else {
        print!("{}", render_outcome(&outcome));
    }
    Ok(())
}
