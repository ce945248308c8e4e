use crate::meta::{encode_metadata, MetaError};
use crate::record::LogEntry;
use crate::storage::SqlParam;

const FIXED_COLUMNS: &str = "label, server_timestamp, level, message, source, file, function, line";

/// One entry mapped to an executable insert.
///
/// `meta_error` carries a metadata encoding failure when the row was
/// degraded to its fixed columns; the row itself is still written.
#[derive(Debug)]
pub struct InsertPlan {
    pub statement: String,
    pub params: Vec<SqlParam>,
    pub meta_error: Option<MetaError>,
}

/// Map a [`LogEntry`] to a parameterized insert against `table`.
///
/// The fixed columns are always bound. The `metadata` column is appended
/// only when metadata is present and encodes successfully; on encode
/// failure the entry degrades to the fixed columns instead of being
/// dropped. The table name is interpolated verbatim: it comes from trusted
/// configuration, never from untrusted input.
pub fn build_insert(table: &str, entry: &LogEntry) -> InsertPlan {
    let encoded = entry.metadata.as_ref().map(encode_metadata);
    build_insert_with(table, entry, encoded)
}

fn build_insert_with(
    table: &str,
    entry: &LogEntry,
    encoded_metadata: Option<Result<Vec<u8>, MetaError>>,
) -> InsertPlan {
    let mut params = vec![
        SqlParam::Text(entry.label.clone()),
        SqlParam::Timestamp(entry.timestamp),
        SqlParam::Text(entry.level.as_str().to_string()),
        SqlParam::Text(entry.message.clone()),
        SqlParam::OptText(entry.source.clone()),
        SqlParam::OptText(entry.file.clone()),
        SqlParam::OptText(entry.function.clone()),
        SqlParam::OptInt(entry.line.and_then(|l| i32::try_from(l).ok())),
    ];

    let mut meta_error = None;
    match encoded_metadata {
        Some(Ok(payload)) => params.push(SqlParam::Jsonb(payload)),
        Some(Err(err)) => meta_error = Some(err),
        None => {}
    }

    let statement = if params.len() > 8 {
        format!(
            "INSERT INTO {} ({}, metadata) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            table, FIXED_COLUMNS
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            table, FIXED_COLUMNS
        )
    };

    InsertPlan {
        statement,
        params,
        meta_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LogLevel;
    use crate::meta::MetaValue;
    use std::collections::BTreeMap;

    fn sample() -> LogEntry {
        LogEntry::new("svc", LogLevel::Info, "hello").with_origin("api", "main.rs", "handle", 42)
    }

    #[test]
    fn fixed_columns_without_metadata() {
        let plan = build_insert("logs", &sample());
        assert_eq!(
            plan.statement,
            "INSERT INTO logs (label, server_timestamp, level, message, source, file, function, line) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        );
        assert_eq!(plan.params.len(), 8);
        assert!(plan.meta_error.is_none());
        assert_eq!(plan.params[0], SqlParam::Text("svc".to_string()));
        assert_eq!(plan.params[2], SqlParam::Text("info".to_string()));
        assert_eq!(plan.params[7], SqlParam::OptInt(Some(42)));
    }

    #[test]
    fn metadata_column_appended_when_present() {
        let mut metadata = BTreeMap::new();
        metadata.insert("user".to_string(), MetaValue::from("alice"));
        let plan = build_insert("logs", &sample().with_metadata(metadata));
        assert!(plan.statement.contains("metadata"));
        assert!(plan.statement.ends_with("$9)"));
        assert_eq!(plan.params.len(), 9);
        match &plan.params[8] {
            SqlParam::Jsonb(payload) => assert_eq!(payload[0], crate::meta::META_FORMAT_VERSION),
            other => panic!("expected jsonb param, got {:?}", other),
        }
    }

    #[test]
    fn encode_failure_degrades_to_fixed_columns() {
        let entry = sample();
        let plan =
            build_insert_with("logs", &entry, Some(Err(MetaError::UnsupportedVersion(9))));
        assert_eq!(plan.params.len(), 8);
        assert!(!plan.statement.contains("metadata"));
        assert!(plan.meta_error.is_some());
    }

    #[test]
    fn table_name_is_interpolated_verbatim() {
        let plan = build_insert("audit.app_logs", &sample());
        assert!(plan.statement.starts_with("INSERT INTO audit.app_logs ("));
    }
}
