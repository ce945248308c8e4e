use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::error::Error;

/// Owned SQL parameter value bound to one placeholder of an insert.
///
/// Keeping the enum owned (rather than exposing driver-specific borrow
/// types) lets the processor build statements without knowing which
/// [`StorageClient`] implementation will execute them, and lets test
/// doubles capture the exact bound values.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    OptText(Option<String>),
    /// Nullable `int4` column, e.g. the source line number.
    OptInt(Option<i32>),
    Timestamp(DateTime<Utc>),
    /// Pre-encoded JSONB payload, marker byte included.
    Jsonb(Vec<u8>),
}

/// Asynchronous destination for the parameterized inserts produced by the
/// processor's batch flush.
///
/// Implementations transport statements to a concrete relational store.
/// The client is expected to have its own independent connect/run step
/// driven by the host; the processor never starts it and simply tolerates
/// failing writes until the client is ready.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Execute a single parameterized statement.
    ///
    /// **Parameters**
    /// - `statement`: SQL text with `$1..$n` placeholders.
    /// - `params`: one [`SqlParam`] per placeholder, in order.
    ///
    /// **Returns**
    /// - `Ok(rows)` with the number of rows affected.
    /// - `Err(..)` if the store rejected the statement or is unreachable.
    ///   The processor treats this as a transient per-entry failure: it is
    ///   logged and the entry is dropped, never retried.
    async fn execute(
        &self,
        statement: &str,
        params: &[SqlParam],
    ) -> Result<u64, Box<dyn Error + Send + Sync>>;
}
