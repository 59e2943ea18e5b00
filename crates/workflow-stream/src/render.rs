//! Console layout for a finished run.

use std::fmt::Write as _;

use serde_json::Value;

use crate::errors::Interruption;
use crate::run::RunOutcome;
use crate::summary::{PrimaryResult, RunReport, ToolResult};

const NO_OUTPUT: &str = "No specific final output or AI delta captured. The workflow may have completed without generating text or a designated output.";

/// Renders the summary block printed after the stream ends.
pub fn render_report(report: &RunReport) -> String {
    let mut out = String::from("\n--- Workflow Execution Summary ---\n");
    let summary = &report.summary;

    if !summary.logs.is_empty() {
        out.push_str("\nWorkflow Logs:\n");
        for log in &summary.logs {
            let _ = writeln!(out, "   {log}");
        }
    }

    if !summary.tool_results.is_empty() {
        out.push_str("\nTool Results Captured:\n");
        for tool in &summary.tool_results {
            render_tool_result(&mut out, tool);
        }
    }

    match &report.primary {
        PrimaryResult::FinalOutput(content) => {
            out.push_str("\nFinal Output (from Output Node):\n");
            let _ = writeln!(out, "{}", display_value(content));
        }
        PrimaryResult::AssembledText(text) => {
            out.push_str("\nAssembled AI Response (from AI Agent):\n");
            let _ = writeln!(out, "{}", text.trim());
        }
        PrimaryResult::NoOutput => {
            let _ = writeln!(out, "\n{NO_OUTPUT}");
        }
    }

    let _ = writeln!(out, "\n{}", report.status);
    out
}

/// Renders the report plus a note when the stream stopped early.
pub fn render_outcome(outcome: &RunOutcome) -> String {
    let mut out = render_report(&outcome.report);
    match &outcome.interruption {
        Some(Interruption::Cancelled) => {
            out.push_str("\nStream cancelled before it ended; the summary above is partial.\n");
        }
        Some(Interruption::Transport(err)) => {
            let _ = writeln!(
                out,
                "\nStream interrupted ({err}); the summary above is partial."
            );
        }
        None => {}
    }
    out
}

fn render_tool_result(out: &mut String, tool: &ToolResult) {
    let _ = writeln!(out, "   - Tool: {}", tool.tool_name);
    let result = match &tool.result {
        Value::Object(_) | Value::Array(_) => indent(&pretty(&tool.result), "       "),
        other => display_value(other),
    };
    let _ = writeln!(out, "     Result: {}", result.trim_start());
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => pretty(value),
        other => other.to_string(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
