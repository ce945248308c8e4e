use crate::level::LogLevel;
use crate::meta::MetaValue;
use crate::processor::ProcessorHandle;
use crate::record::LogEntry;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns events into [`LogEntry`]s and
/// hands them to the processor.
///
/// The layer is deliberately thin: it extracts the message and remaining
/// fields, merges in the layer's own base metadata (call-site fields win
/// on conflict), stamps the origin from the event metadata and calls
/// [`ProcessorHandle::submit`]. Everything after that point is the
/// processor's business; the layer never blocks and never fails.
pub struct DbLogLayer {
    handle: ProcessorHandle,
    label: String,
    /// Per-layer metadata merged into every entry. Mutable after
    /// installation via [`set_metadata`](Self::set_metadata).
    base_metadata: RwLock<BTreeMap<String, MetaValue>>,
    min_level: Level,
}

impl DbLogLayer {
    /// Create a layer submitting to `handle`, labelling every entry with
    /// `label`. Captures all levels by default.
    pub fn new(handle: ProcessorHandle, label: impl Into<String>) -> Self {
        Self {
            handle,
            label: label.into(),
            base_metadata: RwLock::new(BTreeMap::new()),
            min_level: Level::TRACE,
        }
    }

    /// Only persist events at `level` or more severe.
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    /// Set one key in the layer's base metadata. Call-site fields with the
    /// same key override it per entry.
    pub fn set_metadata(&self, key: impl Into<String>, value: MetaValue) {
        let mut base = self
            .base_metadata
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        base.insert(key.into(), value);
    }

    /// Remove one key from the layer's base metadata.
    pub fn remove_metadata(&self, key: &str) -> Option<MetaValue> {
        let mut base = self
            .base_metadata
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        base.remove(key)
    }
}

impl<S> Layer<S> for DbLogLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        // tracing orders levels ERROR < TRACE; "greater" means more verbose.
        if *meta.level() > self.min_level {
            return;
        }

        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;
        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        };
        event.record(&mut visitor);

        let mut metadata = {
            let base = self
                .base_metadata
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            base.clone()
        };
        metadata.extend(fields);

        let entry = LogEntry {
            label: self.label.clone(),
            level: LogLevel::from(meta.level()),
            message: message.unwrap_or_default(),
            metadata: if metadata.is_empty() { None } else { Some(metadata) },
            source: Some(meta.target().to_string()),
            file: meta.file().map(str::to_string),
            function: meta.module_path().map(str::to_string),
            line: meta.line(),
            timestamp: Utc::now(),
        };

        self.handle.submit(entry);
    }
}

use tracing::field::{Field, Visit};

struct FieldVisitor<'a> {
    fields: &'a mut BTreeMap<String, MetaValue>,
    message: &'a mut Option<String>,
}

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), MetaValue::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), MetaValue::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), MetaValue::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), MetaValue::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), MetaValue::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields
                .insert(field.name().to_string(), MetaValue::String(format!("{:?}", value)));
        }
    }
}
