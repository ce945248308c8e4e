use async_trait::async_trait;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tokio::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

use tracing_pg_sink::layer::DbLogLayer;
use tracing_pg_sink::meta::{decode_metadata, MetaValue};
use tracing_pg_sink::processor::{LogProcessor, ProcessorConfig};
use tracing_pg_sink::storage::{SqlParam, StorageClient};

#[derive(Default)]
struct RecordingClient {
    writes: Mutex<Vec<(String, Vec<SqlParam>)>>,
}

impl RecordingClient {
    fn writes(&self) -> Vec<(String, Vec<SqlParam>)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageClient for RecordingClient {
    async fn execute(
        &self,
        statement: &str,
        params: &[SqlParam],
    ) -> Result<u64, Box<dyn Error + Send + Sync>> {
        self.writes
            .lock()
            .unwrap()
            .push((statement.to_string(), params.to_vec()));
        Ok(1)
    }
}

#[tokio::test(start_paused = true)]
async fn events_become_rows_with_merged_metadata() {
    let client = Arc::new(RecordingClient::default());
    let (handle, processor) = LogProcessor::new(
        client.clone(),
        ProcessorConfig {
            table: "logs".to_string(),
            flush_interval: Duration::from_millis(50),
            ..ProcessorConfig::default()
        },
    );
    let worker = tokio::spawn(processor.run());

    let layer = DbLogLayer::new(handle.clone(), "svc");
    layer.set_metadata("env", MetaValue::from("prod"));
    layer.set_metadata("region", MetaValue::from("eu-1"));
    let subscriber = Registry::default().with(layer);

    tracing::subscriber::with_default(subscriber, || {
        // The call-site `env` overrides the layer's base value.
        tracing::info!(user_id = 42u64, env = "staging", "hello");
    });
    tokio::time::sleep(Duration::from_millis(80)).await;

    let writes = client.writes();
    assert_eq!(writes.len(), 1);
    let (statement, params) = &writes[0];
    assert!(statement.contains("metadata"));
    assert_eq!(params[0], SqlParam::Text("svc".to_string()));
    assert_eq!(params[2], SqlParam::Text("info".to_string()));
    assert_eq!(params[3], SqlParam::Text("hello".to_string()));

    let metadata = match &params[8] {
        SqlParam::Jsonb(payload) => decode_metadata(payload).unwrap(),
        other => panic!("expected jsonb param, got {:?}", other),
    };
    assert_eq!(metadata.get("env"), Some(&MetaValue::from("staging")));
    assert_eq!(metadata.get("region"), Some(&MetaValue::from("eu-1")));
    assert_eq!(metadata.get("user_id"), Some(&MetaValue::from("42")));

    handle.shutdown();
    worker.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn min_level_filters_verbose_events() {
    let client = Arc::new(RecordingClient::default());
    let (handle, processor) = LogProcessor::new(
        client.clone(),
        ProcessorConfig {
            table: "logs".to_string(),
            flush_interval: Duration::from_millis(50),
            ..ProcessorConfig::default()
        },
    );
    let worker = tokio::spawn(processor.run());

    let layer = DbLogLayer::new(handle.clone(), "svc").with_min_level(tracing::Level::WARN);
    let subscriber = Registry::default().with(layer);

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!("ignored");
        tracing::error!("kept");
    });
    tokio::time::sleep(Duration::from_millis(80)).await;

    let writes = client.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].1[2], SqlParam::Text("error".to_string()));
    assert_eq!(writes[0].1[3], SqlParam::Text("kept".to_string()));

    handle.shutdown();
    worker.await.unwrap().unwrap();
}
