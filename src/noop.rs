use crate::storage::{SqlParam, StorageClient};
use async_trait::async_trait;
use std::error::Error;

/// A storage client that accepts and discards every statement.
///
/// Useful for measuring the overhead of the processor itself without any
/// external I/O, and for unit tests that don't care about persistence.
#[derive(Clone, Default)]
pub struct NoopClient;

#[async_trait]
impl StorageClient for NoopClient {
    async fn execute(
        &self,
        _statement: &str,
        _params: &[SqlParam],
    ) -> Result<u64, Box<dyn Error + Send + Sync>> {
        Ok(0)
    }
}
