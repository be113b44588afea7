//! Orchestrator module for the change-event ingest.
//!
//! Coordinates the consumer and the change processor, and reports each batch's
//! outcome back to the consumer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::StreamMessage;
use crate::errors::IngestError;
use crate::processor::{BatchReport, ChangeProcessor};
use catalog_sync_shared::ChangeEvent;

pub use crate::consumer::Consumer;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Size of the message channel buffer.
    pub channel_buffer_size: usize,
    /// Interval between progress log lines.
    pub progress_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 1000,
            progress_interval: Duration::from_secs(10),
        }
    }
}

/// Counters kept since startup.
#[derive(Debug, Default)]
pub struct IngestCounters {
    /// Change events in batches that were fully applied.
    pub events_processed: AtomicU64,
    /// Rows whose document was synced or removed.
    pub rows_applied: AtomicU64,
    /// Rows skipped because of a malformed id.
    pub rows_skipped: AtomicU64,
    /// Batches that failed and were handed back for redelivery.
    pub sync_errors: AtomicU64,
}

impl IngestCounters {
    fn record(&self, report: &BatchReport) {
        self.rows_applied
            .fetch_add(report.applied_rows() as u64, Ordering::Relaxed);
        self.rows_skipped
            .fetch_add(report.skipped_rows as u64, Ordering::Relaxed);
    }
}

/// Orchestrator that coordinates the ingest components.
///
/// The orchestrator:
/// - Manages the lifecycle of the consumer
/// - Routes batches to the processor and acknowledgments back
/// - Handles shutdown signals
/// - Logs ingest progress
pub struct Orchestrator {
    consumer: Arc<dyn Consumer>,
    processor: ChangeProcessor,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
    counters: Arc<IngestCounters>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(consumer: Arc<dyn Consumer>, processor: ChangeProcessor) -> Self {
        Self::with_config(consumer, processor, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        consumer: Arc<dyn Consumer>,
        processor: ChangeProcessor,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            consumer,
            processor,
            config,
            shutdown_tx,
            counters: Arc::new(IngestCounters::default()),
        }
    }

    /// Counters shared with the running orchestrator.
    pub fn counters(&self) -> Arc<IngestCounters> {
        Arc::clone(&self.counters)
    }

    /// A handle that triggers shutdown when sent to.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run the orchestrator.
    ///
    /// Blocks until the consumer stream ends, a shutdown signal is received, or
    /// subscription fails. A consumer that stops with an error fails the run so the
    /// process exits non-zero.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<(), IngestError> {
        info!("Starting catalog sync orchestrator");

        self.consumer.subscribe()?;

        let (event_transmitter, mut event_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);
        let (ack_transmitter, ack_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);

        // Start consumer in background
        let consumer = Arc::clone(&self.consumer);
        let shutdown_rx = self.shutdown_tx.subscribe();
        let consumer_handle = tokio::spawn(async move {
            consumer
                .run(event_transmitter, ack_receiver, shutdown_rx)
                .await
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut progress_timer = interval(self.config.progress_interval);
        progress_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut prev_events: u64 = 0;
        let mut prev_time = Instant::now();

        info!("Ready to process change events");

        loop {
            tokio::select! {
                msg = event_receiver.recv() => {
                    match msg {
                        Some(StreamMessage::Events { events, offsets }) => {
                            debug!(
                                event_count = events.len(),
                                offset_count = offsets.len(),
                                "Received events from consumer"
                            );
                            let ack = match self.process_events(events).await {
                                Ok(()) => StreamMessage::Acknowledgment {
                                    offsets,
                                    success: true,
                                    error: None,
                                },
                                Err(e) => {
                                    error!(error = %e, "Failed to process events. Sending NACK to consumer");
                                    self.counters.sync_errors.fetch_add(1, Ordering::Relaxed);
                                    StreamMessage::Acknowledgment {
                                        offsets,
                                        success: false,
                                        error: Some(e.to_string()),
                                    }
                                }
                            };
                            let _ = ack_transmitter.send(ack).await;
                        }
                        Some(StreamMessage::Error(e)) => {
                            error!(error = %e, "Received error from consumer");
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Consumer stream ended");
                            break;
                        }
                        Some(StreamMessage::Acknowledgment { .. }) => {
                            warn!("Received acknowledgment on event channel (should be on ack channel)");
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    let _ = self.shutdown_tx.send(());
                    break;
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = progress_timer.tick() => {
                    let events = self.counters.events_processed.load(Ordering::Relaxed);
                    let now = Instant::now();
                    let elapsed_secs = now.duration_since(prev_time).as_secs_f64();
                    let events_per_sec = if elapsed_secs > 0.0 {
                        (events.saturating_sub(prev_events) as f64) / elapsed_secs
                    } else {
                        0.0
                    };

                    info!(
                        events_processed = events,
                        rows_applied = self.counters.rows_applied.load(Ordering::Relaxed),
                        rows_skipped = self.counters.rows_skipped.load(Ordering::Relaxed),
                        sync_errors = self.counters.sync_errors.load(Ordering::Relaxed),
                        events_per_sec = format!("{:.2}", events_per_sec),
                        "Processing progress"
                    );

                    prev_events = events;
                    prev_time = now;
                }
            }
        }

        // Drop our ack sender so a consumer waiting on acknowledgments sees the channel close.
        drop(ack_transmitter);
        let consumer_result = consumer_handle
            .await
            .unwrap_or_else(|e| Err(IngestError::channel(format!("consumer task failed: {}", e))));
        if let Err(e) = consumer_result {
            error!(error = %e, "Consumer stopped with an error");
            return Err(e);
        }

        info!(
            total_events_processed = self.counters.events_processed.load(Ordering::Relaxed),
            total_rows_applied = self.counters.rows_applied.load(Ordering::Relaxed),
            total_sync_errors = self.counters.sync_errors.load(Ordering::Relaxed),
            "Orchestrator shutdown complete"
        );
        Ok(())
    }

    /// Process a batch of events.
    ///
    /// Returns `Ok` only once every row in the batch has been applied to the index,
    /// so the caller only acknowledges fully applied batches.
    async fn process_events(&self, events: Vec<ChangeEvent>) -> Result<(), IngestError> {
        let started = Instant::now();
        let report = self.processor.process_batch(&events).await?;
        self.counters
            .events_processed
            .fetch_add(events.len() as u64, Ordering::Relaxed);
        self.counters.record(&report);

        debug!(
            event_count = report.events,
            rows_applied = report.applied_rows(),
            rows_skipped = report.skipped_rows,
            latency_ms = started.elapsed().as_millis() as u64,
            "Batch applied"
        );
        Ok(())
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
