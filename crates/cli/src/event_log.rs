// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Newline-delimited JSON event log.
//!
//! Each selection configuration appends a START and END event pair, giving
//! downstream tooling wall-clock bounds per run.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File name of the event log inside a selection output directory.
pub const EVENT_LOG_FILE: &str = "event.log";

/// Event name prefix emitted before a selection run.
pub const RTS_START_EVENT: &str = "START_BINARY_RTS_SELECTION";

/// Event name prefix emitted after a selection run.
pub const RTS_END_EVENT: &str = "END_BINARY_RTS_SELECTION";

/// One log record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEvent {
    pub name: String,
    pub value: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl LogEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Append this event as one JSON line.
    pub fn append(&self, log_file: &Path) -> Result<()> {
        let json = serde_json::to_string(self).map_err(|e| Error::Serialize {
            path: log_file.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .map_err(|e| Error::io(log_file, e))?;
        writeln!(file, "{json}").map_err(|e| Error::io(log_file, e))
    }

    /// Read back all events of a log.
    pub fn read_from_log(log_file: &Path) -> Result<Vec<LogEvent>> {
        let content =
            std::fs::read_to_string(log_file).map_err(|e| Error::io(log_file, e))?;
        let mut events = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let event = serde_json::from_str(line).map_err(|e| Error::Serialize {
                path: log_file.to_path_buf(),
                message: e.to_string(),
            })?;
            events.push(event);
        }
        Ok(events)
    }
}

#[cfg(test)]
#[path = "event_log_tests.rs"]
mod tests;
