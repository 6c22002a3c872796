//! Buffered JSON lines event recorder

use super::{EventRecord, EventSink, SinkError};
use crate::config::EventsConfig;
use crate::telemetry;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, oneshot};

enum Command {
    Record(EventRecord),
    Flush(oneshot::Sender<()>),
}

/// Recording statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecorderStats {
    pub events_received: u64,
    pub events_written: u64,
    pub events_dropped: u64,
    pub write_errors: u64,
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    written: AtomicU64,
    dropped: AtomicU64,
    write_errors: AtomicU64,
}

/// Appends event records to a per-session JSON lines file.
///
/// `record` hands the event to a background writer over a bounded channel
/// and never waits; events that do not fit are counted as dropped.
pub struct EventRecorder {
    tx: mpsc::Sender<Command>,
    counters: Arc<Counters>,
    path: PathBuf,
}

impl EventRecorder {
    /// Start a recorder writing to `<output_dir>/trading_<session>.jsonl`
    pub fn start(config: &EventsConfig) -> Result<Self, SinkError> {
        let session_id = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let path = config
            .output_dir
            .join(format!("trading_{session_id}.jsonl"));
        Self::start_at(path, config)
    }

    /// Start a recorder writing to an explicit file
    pub fn start_at(path: impl Into<PathBuf>, config: &EventsConfig) -> Result<Self, SinkError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let (tx, rx) = mpsc::channel(config.buffer_size.max(1));
        let counters = Arc::new(Counters::default());

        let writer_path = path.clone();
        let writer_counters = counters.clone();
        let flush_interval = std::time::Duration::from_secs(config.flush_interval_secs.max(1));
        tokio::spawn(async move {
            Self::run_writer(rx, writer_path, flush_interval, writer_counters).await;
        });

        tracing::info!(path = ?path, "Event recorder started");
        Ok(Self { tx, counters, path })
    }

    /// Output file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait until every event recorded so far is on disk
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }

    pub fn stats(&self) -> RecorderStats {
        RecorderStats {
            events_received: self.counters.received.load(Ordering::Relaxed),
            events_written: self.counters.written.load(Ordering::Relaxed),
            events_dropped: self.counters.dropped.load(Ordering::Relaxed),
            write_errors: self.counters.write_errors.load(Ordering::Relaxed),
        }
    }

    /// Run the writer task
    async fn run_writer(
        mut rx: mpsc::Receiver<Command>,
        path: PathBuf,
        flush_interval: std::time::Duration,
        counters: Arc<Counters>,
    ) {
        let file = match OpenOptions::new().create(true).append(true).open(&path).await {
            Ok(file) => file,
            Err(e) => {
                tracing::error!(error = %e, path = ?path, "Failed to open event log");
                // Keep draining so senders never observe a closed channel
                while let Some(command) = rx.recv().await {
                    match command {
                        Command::Record(_) => {
                            counters.write_errors.fetch_add(1, Ordering::Relaxed);
                        }
                        Command::Flush(ack) => {
                            let _ = ack.send(());
                        }
                    }
                }
                return;
            }
        };
        let mut writer = BufWriter::new(file);
        let mut ticker = tokio::time::interval(flush_interval);

        loop {
            tokio::select! {
                command = rx.recv() => {
                    match command {
                        Some(Command::Record(record)) => {
                            Self::write_record(&mut writer, &record, &counters).await;
                        }
                        Some(Command::Flush(ack)) => {
                            Self::flush_writer(&mut writer).await;
                            let _ = ack.send(());
                        }
                        None => {
                            // Channel closed, flush remaining and exit
                            Self::flush_writer(&mut writer).await;
                            tracing::info!("Event writer shutting down");
                            break;
                        }
                    }
                }

                _ = ticker.tick() => {
                    Self::flush_writer(&mut writer).await;
                }
            }
        }
    }

    async fn write_record(
        writer: &mut BufWriter<tokio::fs::File>,
        record: &EventRecord,
        counters: &Counters,
    ) {
        let mut line = match serde_json::to_vec(record) {
            Ok(line) => line,
            Err(e) => {
                counters.write_errors.fetch_add(1, Ordering::Relaxed);
                tracing::error!(error = %e, "Failed to serialize event");
                return;
            }
        };
        line.push(b'\n');

        match writer.write_all(&line).await {
            Ok(()) => {
                counters.written.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                counters.write_errors.fetch_add(1, Ordering::Relaxed);
                tracing::error!(error = %e, "Failed to write event");
            }
        }
    }

    async fn flush_writer(writer: &mut BufWriter<tokio::fs::File>) {
        if let Err(e) = writer.flush().await {
            tracing::error!(error = %e, "Failed to flush event log");
        }
    }
}

impl EventSink for EventRecorder {
    fn record(&self, event: EventRecord) {
        self.counters.received.fetch_add(1, Ordering::Relaxed);
        match self.tx.try_send(Command::Record(event)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(Command::Record(dropped))) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                telemetry::record_dropped_event();
                tracing::warn!(
                    event_id = %dropped.id,
                    kind = dropped.event.kind(),
                    "Event buffer full, dropping event"
                );
            }
            Err(_) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                telemetry::record_dropped_event();
                tracing::error!("Event writer stopped, dropping event");
            }
        }
    }
}
