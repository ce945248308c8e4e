use crate::insert::build_insert;
use crate::record::LogEntry;
use crate::storage::StorageClient;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Knobs for the buffering processor.
///
/// **Fields**
/// - `table`: target table; interpolated verbatim into generated inserts,
///   so it must come from trusted configuration.
/// - `flush_interval`: maximum time between batch flushes.
/// - `max_batch_size`: buffered-entry count that triggers a flush before
///   the timer fires.
/// - `channel_buffer`: capacity of the submission queue; a full queue
///   drops new entries instead of blocking the caller.
#[derive(Clone, Debug)]
pub struct ProcessorConfig {
    pub table: String,
    pub flush_interval: Duration,
    pub max_batch_size: usize,
    pub channel_buffer: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            table: "logs".to_string(),
            flush_interval: Duration::from_secs(1),
            max_batch_size: 128,
            channel_buffer: 1024,
        }
    }
}

/// The one fatal error class that can escape [`LogProcessor::run`].
///
/// Per-entry storage and encoding failures never propagate; they are
/// logged, counted and the affected entry is dropped.
#[derive(thiserror::Error, Debug)]
pub enum ProcessorError {
    #[error("submission queue closed while the processor was still running")]
    SubmitChannelClosed,
}

/// Counters shared between the handle and the run loop.
#[derive(Debug, Default)]
pub struct ProcessorStats {
    /// Entries accepted into the submission queue.
    pub enqueued: AtomicU64,
    /// Entries discarded: gate closed, queue full, or shutdown raced the hop.
    pub dropped: AtomicU64,
    /// Insert attempts rejected by the storage client.
    pub write_failures: AtomicU64,
    /// Rows degraded to fixed columns because metadata failed to encode.
    pub encode_failures: AtomicU64,
}

/// Cheap, cloneable submission/shutdown endpoint for [`LogProcessor`].
///
/// Any number of handles may exist; they share the running flag, the
/// submission queue and the stats counters.
#[derive(Clone)]
pub struct ProcessorHandle {
    sender: mpsc::Sender<LogEntry>,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    pub stats: Arc<ProcessorStats>,
}

impl ProcessorHandle {
    /// Submit one entry for eventual persistence. Non-blocking; callable
    /// concurrently from any task or thread. Callers never observe an
    /// error: on a closed gate or a full queue the entry is counted as
    /// dropped and a diagnostic line is emitted.
    ///
    /// The running flag is checked here and re-checked by the worker when
    /// it dequeues the entry, closing the window where a submission is
    /// accepted just as shutdown starts.
    pub fn submit(&self, entry: LogEntry) {
        if !self.running.load(Ordering::Relaxed) {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            eprintln!("log processor is shut down, discarding entry");
            return;
        }

        match self.sender.try_send(entry) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                eprintln!("log queue full, dropping entry");
            }
            Err(TrySendError::Closed(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Begin graceful shutdown. Synchronous, non-blocking and idempotent:
    /// the running flag makes exactly one `true -> false` transition, and
    /// only the call that performed it wakes the run loop. Repeat signals
    /// produce a single diagnostic line and nothing else.
    ///
    /// **Returns** whether this call performed the transition.
    pub fn shutdown(&self) -> bool {
        let was_running = self.running.swap(false, Ordering::Relaxed);
        if was_running {
            // notify_one stores a permit, so a signal delivered before the
            // loop registers its waiter is not lost.
            self.shutdown.notify_one();
        } else {
            eprintln!("shutdown already requested, ignoring repeat signal");
        }
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

/// Buffering/flushing coordinator between log producers and the storage
/// client.
///
/// All buffer access happens inside [`run`](LogProcessor::run), the single
/// serialized context; producers only ever touch the submission queue and
/// the atomic running flag, so the buffer itself needs no lock.
pub struct LogProcessor {
    client: Arc<dyn StorageClient>,
    config: ProcessorConfig,
    receiver: mpsc::Receiver<LogEntry>,
    buffer: Vec<LogEntry>,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    stats: Arc<ProcessorStats>,
}

impl LogProcessor {
    /// Build a processor and its submission handle.
    ///
    /// Minimal thresholds are enforced on the config to avoid degenerate
    /// setups (zero-capacity queues, sub-10ms flush storms).
    pub fn new(
        client: Arc<dyn StorageClient>,
        config: ProcessorConfig,
    ) -> (ProcessorHandle, LogProcessor) {
        let mut config = config;
        config.channel_buffer = config.channel_buffer.max(16);
        config.max_batch_size = config.max_batch_size.max(1);
        if config.flush_interval < Duration::from_millis(10) {
            config.flush_interval = Duration::from_millis(10);
        }

        let (sender, receiver) = mpsc::channel(config.channel_buffer);
        let running = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(Notify::new());
        let stats = Arc::new(ProcessorStats::default());

        let handle = ProcessorHandle {
            sender,
            running: Arc::clone(&running),
            shutdown: Arc::clone(&shutdown),
            stats: Arc::clone(&stats),
        };

        let processor = LogProcessor {
            client,
            config,
            receiver,
            buffer: Vec::new(),
            running,
            shutdown,
            stats,
        };

        (handle, processor)
    }

    /// Drive the flush loop until shutdown completes.
    ///
    /// Active phase: wait on the shutdown wake-up, the submission queue and
    /// the flush timer (in that priority). Dequeued entries are appended to
    /// the buffer after re-checking the running flag; the buffer is flushed
    /// when the timer fires or the buffer reaches `max_batch_size`.
    ///
    /// Draining phase, entered on the shutdown wake-up: entries already in
    /// the queue completed their submission hop before the flag flipped, so
    /// they are pulled into the buffer and written in one final flush, after
    /// which `run` returns.
    ///
    /// The only error path is the submission queue closing while the flag
    /// is still up (every handle dropped without a shutdown signal); that
    /// forces the flag down and surfaces as [`ProcessorError`].
    pub async fn run(mut self) -> Result<(), ProcessorError> {
        let mut ticker = interval(self.config.flush_interval);
        // A slow storage write delays the next tick instead of bursting.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => break,

                received = self.receiver.recv() => match received {
                    Some(entry) => {
                        if !self.running.load(Ordering::Relaxed) {
                            // Shutdown began between the submit-side check
                            // and the dequeue.
                            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                            continue;
                        }
                        self.buffer.push(entry);
                        if self.buffer.len() >= self.config.max_batch_size {
                            self.flush().await;
                        }
                    }
                    None => {
                        self.running.store(false, Ordering::Relaxed);
                        return Err(ProcessorError::SubmitChannelClosed);
                    }
                },

                _ = ticker.tick() => self.flush().await,
            }
        }

        while let Ok(entry) = self.receiver.try_recv() {
            self.buffer.push(entry);
        }
        self.flush().await;
        Ok(())
    }

    /// Snapshot-and-clear the buffer, then write each entry sequentially.
    /// Empty snapshots are a no-op. Failures are isolated per entry: a bad
    /// row is logged and dropped, the rest of the batch proceeds.
    async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.buffer);

        for entry in batch {
            let plan = build_insert(&self.config.table, &entry);
            if let Some(err) = plan.meta_error {
                self.stats.encode_failures.fetch_add(1, Ordering::Relaxed);
                eprintln!("metadata encoding failed, inserting row without it: {}", err);
            }
            if let Err(err) = self.client.execute(&plan.statement, &plan.params).await {
                self.stats.write_failures.fetch_add(1, Ordering::Relaxed);
                eprintln!("log insert failed, dropping entry: {}", err);
            }
        }
    }
}
