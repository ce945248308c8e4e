use crate::layer::DbLogLayer;
use crate::processor::{LogProcessor, ProcessorConfig, ProcessorError, ProcessorHandle};
use crate::storage::StorageClient;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Wiring configuration for [`init_tracing_with_config`].
///
/// **Fields**
/// - `table`: target table for generated inserts (trusted, interpolated
///   verbatim).
/// - `label`: logger label stamped on every entry.
/// - `channel_buffer`: submission-queue capacity before new entries drop.
/// - `max_batch_size`: buffered-entry count triggering an early flush.
/// - `flush_interval`: maximum interval between flushes.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt` layer is
///   stacked on top so events also reach the console.
#[derive(Clone, Debug)]
pub struct SinkConfig {
    pub table: String,
    pub label: String,
    pub channel_buffer: usize,
    pub max_batch_size: usize,
    pub flush_interval: Duration,
    pub enable_stdout: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            table: "logs".to_string(),
            label: "app".to_string(),
            channel_buffer: 1024,
            max_batch_size: 128,
            flush_interval: Duration::from_secs(1),
            enable_stdout: true,
        }
    }
}

/// Install the global `tracing` subscriber backed by `client` and spawn the
/// processor's run loop.
///
/// **Parameters**
/// - `client`: [`StorageClient`] that will receive the generated inserts.
/// - `config`: [`SinkConfig`] controlling buffering, batching and wiring.
///
/// **Returns**
/// - The [`ProcessorHandle`] for direct submissions and shutdown delivery.
/// - The `JoinHandle` of the run loop; the host should call
///   [`ProcessorHandle::shutdown`] and await it for a clean drain.
pub fn init_tracing_with_config(
    client: Arc<dyn StorageClient>,
    config: SinkConfig,
) -> (ProcessorHandle, JoinHandle<Result<(), ProcessorError>>) {
    let (handle, processor) = LogProcessor::new(
        client,
        ProcessorConfig {
            table: config.table,
            flush_interval: config.flush_interval,
            max_batch_size: config.max_batch_size,
            channel_buffer: config.channel_buffer,
        },
    );
    let worker = tokio::spawn(processor.run());

    let layer = DbLogLayer::new(handle.clone(), config.label);
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    }

    (handle, worker)
}

/// [`init_tracing_with_config`] with [`SinkConfig::default`]. Recommended
/// entrypoint for typical services.
pub fn init_tracing(
    client: Arc<dyn StorageClient>,
) -> (ProcessorHandle, JoinHandle<Result<(), ProcessorError>>) {
    init_tracing_with_config(client, SinkConfig::default())
}
