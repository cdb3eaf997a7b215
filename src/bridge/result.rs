//! Final execution result and its emission on stdout.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::execution_log::LogEntry;

/// Line that separates streamed log lines from the final JSON payload.
pub const FINAL_RESULT_SENTINEL: &str = "__FINAL_RESULT__";

/// Outcome of one bridge run. Created once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub logs: Vec<LogEntry>,
}

impl ExecutionResult {
    pub fn completed(result: String, tokens_used: u64, cost: f64, logs: Vec<LogEntry>) -> Self {
        Self {
            success: true,
            result: Some(result),
            tokens_used: Some(tokens_used),
            cost: Some(cost),
            error: None,
            logs,
        }
    }

    pub fn failed(error: impl Into<String>, logs: Vec<LogEntry>) -> Self {
        Self {
            success: false,
            result: None,
            tokens_used: None,
            cost: None,
            error: Some(error.into()),
            logs,
        }
    }
}

/// Write the sentinel line followed by the pretty-printed result.
pub fn emit_final_result(out: &mut dyn Write, result: &ExecutionResult) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", FINAL_RESULT_SENTINEL)?;
    serde_json::to_writer_pretty(&mut *out, result)?;
    writeln!(out)?;
    out.flush()
}
