use crate::level::LogLevel;
use crate::meta::MetaValue;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Immutable snapshot of one log call.
///
/// The timestamp is captured at submission time; everything else mirrors the
/// call site. Ownership moves into the processor on submission and the entry
/// is discarded after its write attempt, successful or not.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// Logger label, typically the service or subsystem name.
    pub label: String,
    pub level: LogLevel,
    pub message: String,
    pub metadata: Option<BTreeMap<String, MetaValue>>,
    /// Component that emitted the entry (the `tracing` target).
    pub source: Option<String>,
    pub file: Option<String>,
    pub function: Option<String>,
    pub line: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(label: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            level,
            message: message.into(),
            metadata: None,
            source: None,
            file: None,
            function: None,
            line: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, MetaValue>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_origin(
        mut self,
        source: impl Into<String>,
        file: impl Into<String>,
        function: impl Into<String>,
        line: u32,
    ) -> Self {
        self.source = Some(source.into());
        self.file = Some(file.into());
        self.function = Some(function.into());
        self.line = Some(line);
        self
    }
}
