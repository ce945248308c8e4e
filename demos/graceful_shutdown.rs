use std::sync::Arc;

use tracing_pg_sink::level::LogLevel;
use tracing_pg_sink::meta::MetaValue;
use tracing_pg_sink::noop::NoopClient;
use tracing_pg_sink::processor::{LogProcessor, ProcessorConfig};
use tracing_pg_sink::record::LogEntry;

/// Direct processor usage without the tracing layer: a lifecycle host that
/// runs the flush loop alongside a producer and drains it on ctrl-c.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (handle, processor) = LogProcessor::new(
        Arc::new(NoopClient),
        ProcessorConfig {
            flush_interval: std::time::Duration::from_millis(250),
            ..ProcessorConfig::default()
        },
    );
    let worker = tokio::spawn(processor.run());

    let producer_handle = handle.clone();
    let producer = tokio::spawn(async move {
        let mut n = 0u64;
        while producer_handle.is_running() {
            let mut metadata = std::collections::BTreeMap::new();
            metadata.insert("seq".to_string(), MetaValue::from(n));
            producer_handle.submit(
                LogEntry::new("demo", LogLevel::Info, format!("tick {}", n))
                    .with_metadata(metadata),
            );
            n += 1;
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    });

    tokio::signal::ctrl_c().await?;
    // First signal flips the gate; a repeat would be a logged no-op.
    handle.shutdown();

    producer.await?;
    worker.await??;
    println!(
        "drained; enqueued={} dropped={}",
        handle.stats.enqueued.load(std::sync::atomic::Ordering::Relaxed),
        handle.stats.dropped.load(std::sync::atomic::Ordering::Relaxed),
    );
    Ok(())
}
