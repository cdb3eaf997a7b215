//! Caller-facing execution log.
//!
//! Every entry is written out the moment it is recorded and also kept in
//! order, so the final result can embed the full sequence. Entries are
//! mirrored to `tracing` for local diagnostics (stderr).

use std::io::Write;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity of a log entry as the calling application understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

/// One log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    pub level: LogLevel,
    pub message: String,
    /// Structured payload; serialized as `null` when absent
    #[serde(default)]
    pub data: Option<Value>,
    /// Local time, ISO-8601 without offset
    pub timestamp: String,
}

/// How entries are rendered on the live channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line (bridge wire format)
    JsonLines,
    /// `[LEVEL] message` plus an indented data block
    Human,
}

/// Ordered log for one execution.
pub struct ExecutionLog {
    execution_id: Option<String>,
    format: LogFormat,
    entries: Vec<LogEntry>,
    writer: Box<dyn Write + Send>,
}

impl ExecutionLog {
    pub fn new(
        execution_id: Option<String>,
        format: LogFormat,
        writer: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            execution_id,
            format,
            entries: Vec::new(),
            writer,
        }
    }

    /// Log that streams to the process's standard output.
    pub fn stdout(execution_id: Option<String>, format: LogFormat) -> Self {
        Self::new(execution_id, format, Box::new(std::io::stdout()))
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>, data: Option<Value>) {
        let entry = LogEntry {
            execution_id: self.execution_id.clone(),
            level,
            message: message.into(),
            data,
            timestamp: chrono::Local::now()
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
        };

        match level {
            LogLevel::Info => tracing::info!(execution_id = ?entry.execution_id, "{}", entry.message),
            LogLevel::Warning => tracing::warn!(execution_id = ?entry.execution_id, "{}", entry.message),
            LogLevel::Error => tracing::error!(execution_id = ?entry.execution_id, "{}", entry.message),
        }

        if let Err(e) = self.write_entry(&entry) {
            tracing::warn!("Could not write log entry: {}", e);
        }
        self.entries.push(entry);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message, None);
    }

    pub fn info_with(&mut self, message: impl Into<String>, data: Value) {
        self.log(LogLevel::Info, message, Some(data));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message, None);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message, None);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries recorded at `level`.
    pub fn count(&self, level: LogLevel) -> usize {
        self.entries.iter().filter(|e| e.level == level).count()
    }

    /// The live channel, for output that must follow the log lines.
    pub fn writer_mut(&mut self) -> &mut (dyn Write + Send) {
        self.writer.as_mut()
    }

    fn write_entry(&mut self, entry: &LogEntry) -> std::io::Result<()> {
        match self.format {
            LogFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, entry)?;
                writeln!(self.writer)?;
            }
            LogFormat::Human => {
                writeln!(
                    self.writer,
                    "[{}] {}",
                    entry.level.as_str().to_uppercase(),
                    entry.message
                )?;
                if let Some(data) = entry.data.as_ref().filter(|d| !is_empty_value(d)) {
                    writeln!(self.writer, "  Data: {}", serde_json::to_string_pretty(data)?)?;
                }
            }
        }
        self.writer.flush()
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Cloneable in-memory writer for capturing output in tests.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct SharedBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl SharedBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

#[cfg(test)]
impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
