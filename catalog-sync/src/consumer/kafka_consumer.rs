//! Kafka consumer implementation for the catalog sync engine.
//!
//! Consumes the catalog's change events (JSON, one event per message) and
//! forwards them to the orchestrator in batches. Offsets are committed only after
//! the orchestrator acknowledges a batch. A failed batch is redelivered by seeking
//! its partitions back, with exponential backoff, up to a bounded number of times.

use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer as _, StreamConsumer},
    message::{BorrowedMessage, Message as KafkaMessage},
    Offset, TopicPartitionList,
};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::messages::{MessageOffset, StreamMessage};
use crate::consumer::Consumer;
use crate::errors::IngestError;
use catalog_sync_shared::ChangeEvent;

/// Default batch size for Kafka message batching.
const DEFAULT_BATCH_SIZE: usize = 50;

/// Default batch timeout in milliseconds.
const DEFAULT_BATCH_TIMEOUT_MS: u64 = 1000;

/// Default number of redeliveries before a batch is dead-lettered.
pub const DEFAULT_MAX_REDELIVERY: u32 = 16;

/// Default delay before the first redelivery.
pub const DEFAULT_REDELIVERY_BACKOFF_MS: u64 = 1000;

/// Upper bound on the delay between redeliveries.
const MAX_REDELIVERY_BACKOFF: Duration = Duration::from_secs(60);

/// Timeout for seeking a partition back.
const SEEK_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for [`KafkaConsumer`].
#[derive(Debug, Clone)]
pub struct KafkaConsumerConfig {
    /// Kafka broker addresses (comma-separated).
    pub brokers: String,
    pub group_id: String,
    /// Topic carrying the catalog's change events.
    pub topic: String,
    /// Number of messages to batch before sending.
    pub batch_size: usize,
    /// Maximum time to wait before flushing a partial batch.
    pub batch_timeout: Duration,
    /// Redeliveries allowed per batch before it is dead-lettered.
    pub max_redelivery: u32,
    /// Delay before the first redelivery; doubled on each further attempt.
    pub redelivery_backoff: Duration,
}

impl KafkaConsumerConfig {
    pub fn new(
        brokers: impl Into<String>,
        group_id: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            brokers: brokers.into(),
            group_id: group_id.into(),
            topic: topic.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_timeout: Duration::from_millis(DEFAULT_BATCH_TIMEOUT_MS),
            max_redelivery: DEFAULT_MAX_REDELIVERY,
            redelivery_backoff: Duration::from_millis(DEFAULT_REDELIVERY_BACKOFF_MS),
        }
    }
}

/// What to do with a batch that was not acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeliveryDecision {
    /// Wait `backoff`, then seek each listed partition back to its offset.
    Retry {
        attempt: u32,
        backoff: Duration,
        rewind: Vec<MessageOffset>,
    },
    /// The redelivery budget is spent; commit past the batch.
    DeadLetter { attempts: u32 },
}

/// Counts redeliveries of the batch starting at each partition's first offset.
#[derive(Debug)]
pub struct RedeliveryTracker {
    max_redelivery: u32,
    base_backoff: Duration,
    attempts: HashMap<(String, i32), (i64, u32)>,
}

impl RedeliveryTracker {
    pub fn new(max_redelivery: u32, base_backoff: Duration) -> Self {
        Self {
            max_redelivery,
            base_backoff,
            attempts: HashMap::new(),
        }
    }

    /// Lowest offset per partition in `offsets`, ordered by topic and partition.
    fn first_offsets(offsets: &[MessageOffset]) -> Vec<MessageOffset> {
        let mut first: BTreeMap<(&str, i32), i64> = BTreeMap::new();
        for (topic, partition, offset) in offsets {
            first
                .entry((topic.as_str(), *partition))
                .and_modify(|current| *current = (*current).min(*offset))
                .or_insert(*offset);
        }
        first
            .into_iter()
            .map(|((topic, partition), offset)| (topic.to_string(), partition, offset))
            .collect()
    }

    /// Record a failed delivery of the batch covering `offsets`.
    pub fn on_failure(&mut self, offsets: &[MessageOffset]) -> RedeliveryDecision {
        let rewind = Self::first_offsets(offsets);

        let mut attempt = 0;
        for (topic, partition, offset) in &rewind {
            let entry = self
                .attempts
                .entry((topic.clone(), *partition))
                .or_insert((*offset, 0));
            if entry.0 != *offset {
                *entry = (*offset, 0);
            }
            entry.1 += 1;
            attempt = attempt.max(entry.1);
        }

        if attempt > self.max_redelivery {
            self.forget(&rewind);
            return RedeliveryDecision::DeadLetter {
                attempts: attempt - 1,
            };
        }

        RedeliveryDecision::Retry {
            attempt,
            backoff: self.backoff(attempt),
            rewind,
        }
    }

    /// Record that the batch covering `offsets` was processed.
    pub fn on_success(&mut self, offsets: &[MessageOffset]) {
        self.forget(offsets);
    }

    fn forget(&mut self, offsets: &[MessageOffset]) {
        for (topic, partition, _) in offsets {
            self.attempts.remove(&(topic.clone(), *partition));
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_backoff
            .checked_mul(factor)
            .unwrap_or(MAX_REDELIVERY_BACKOFF)
            .min(MAX_REDELIVERY_BACKOFF)
    }
}

/// Pending message information for batching.
struct PendingMessage {
    offset: MessageOffset,
    /// `None` for messages with no usable event; they are still committed with the batch.
    event: Option<ChangeEvent>,
}

/// Kafka consumer for the catalog's change events.
///
/// At most one batch is in flight: reading pauses until the orchestrator
/// acknowledges the current batch, so a rewind never races a later batch's commit.
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    config: KafkaConsumerConfig,
}

impl KafkaConsumer {
    /// Create a new Kafka consumer.
    ///
    /// # Returns
    ///
    /// * `Ok(KafkaConsumer)` - A new consumer instance
    /// * `Err(IngestError)` - If consumer creation fails
    pub fn new(config: KafkaConsumerConfig) -> Result<Self, IngestError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(
            brokers = %config.brokers,
            group_id = %config.group_id,
            topic = %config.topic,
            batch_size = config.batch_size,
            batch_timeout_ms = config.batch_timeout.as_millis() as u64,
            max_redelivery = config.max_redelivery,
            "Created Kafka consumer with batching"
        );

        Ok(Self { consumer, config })
    }

    /// Flush a batch of pending messages to the channel.
    async fn flush_batch(
        &self,
        batch: &mut Vec<PendingMessage>,
        sender: &mpsc::Sender<StreamMessage>,
    ) -> Result<(), IngestError> {
        let (events, offsets): (Vec<_>, Vec<_>) = batch
            .drain(..)
            .map(|pending| (pending.event, pending.offset))
            .unzip();
        let events: Vec<ChangeEvent> = events.into_iter().flatten().collect();

        info!(
            event_count = events.len(),
            offset_count = offsets.len(),
            "Sending batch of change events to processor"
        );
        sender
            .send(StreamMessage::Events { events, offsets })
            .await
            .map_err(|e| IngestError::channel(e.to_string()))
    }

    /// Commit offsets for a batch of messages.
    fn commit_offsets(&self, offsets: &[MessageOffset]) -> Result<(), IngestError> {
        if offsets.is_empty() {
            return Ok(());
        }

        let mut tpl = TopicPartitionList::new();
        for (topic, partition, offset) in offsets {
            tpl.add_partition_offset(topic, *partition, Offset::Offset(offset + 1))?;
        }

        self.consumer.commit(&tpl, CommitMode::Async)?;
        Ok(())
    }

    /// Seek each partition back to the given offset.
    fn rewind(&self, rewind: &[MessageOffset]) -> Result<(), IngestError> {
        for (topic, partition, offset) in rewind {
            self.consumer
                .seek(topic, *partition, Offset::Offset(*offset), SEEK_TIMEOUT)?;
        }
        Ok(())
    }

    /// Handle the orchestrator's verdict on the in-flight batch.
    ///
    /// Returns `false` if shutdown was requested while waiting to redeliver.
    async fn handle_acknowledgment(
        &self,
        tracker: &mut RedeliveryTracker,
        offsets: Vec<MessageOffset>,
        success: bool,
        error: Option<String>,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<bool, IngestError> {
        if success {
            tracker.on_success(&offsets);
            match self.commit_offsets(&offsets) {
                Ok(()) => debug!(offset_count = offsets.len(), "Committed offsets after successful processing"),
                Err(e) => error!(error = %e, "Failed to commit offsets after acknowledgment"),
            }
            return Ok(true);
        }

        let reason = error.as_deref().unwrap_or("Unknown error");
        match tracker.on_failure(&offsets) {
            RedeliveryDecision::Retry {
                attempt,
                backoff,
                rewind,
            } => {
                warn!(
                    attempt = attempt,
                    max_redelivery = self.config.max_redelivery,
                    backoff_ms = backoff.as_millis() as u64,
                    error = reason,
                    "Batch failed, scheduling redelivery"
                );
                tokio::select! {
                    _ = tokio::time::sleep(backoff) => {}
                    _ = shutdown.recv() => return Ok(false),
                }
                self.rewind(&rewind)?;
            }
            RedeliveryDecision::DeadLetter { attempts } => {
                error!(
                    attempts = attempts,
                    offsets = ?offsets,
                    error = reason,
                    "Batch exceeded maximum redeliveries, dead-lettering and committing past it"
                );
                self.commit_offsets(&offsets)?;
            }
        }
        Ok(true)
    }
}

/// Decode a Kafka payload into a change event.
///
/// Empty and undecodable payloads yield `None`; they carry nothing to apply and
/// retrying them cannot help.
fn decode_payload(payload: Option<&[u8]>) -> Option<ChangeEvent> {
    let payload = match payload {
        Some(p) if !p.is_empty() => p,
        _ => {
            debug!("Received message with empty payload");
            return None;
        }
    };

    match ChangeEvent::from_slice(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            error!(error = %e, payload_len = payload.len(), "Failed to decode change event");
            None
        }
    }
}

fn pending_from(msg: &BorrowedMessage<'_>) -> PendingMessage {
    debug!(
        topic = %msg.topic(),
        partition = msg.partition(),
        offset = msg.offset(),
        "Received message from Kafka"
    );
    PendingMessage {
        offset: (msg.topic().to_string(), msg.partition(), msg.offset()),
        event: decode_payload(msg.payload()),
    }
}

#[async_trait]
impl Consumer for KafkaConsumer {
    fn subscribe(&self) -> Result<(), IngestError> {
        self.consumer
            .subscribe(&[self.config.topic.as_str()])
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(topic = %self.config.topic, "Subscribed to Kafka topic");
        Ok(())
    }

    /// Start consuming messages and send them through the channel.
    #[instrument(skip(self, sender, ack_receiver, shutdown))]
    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut ack_receiver: mpsc::Receiver<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError> {
        use futures::StreamExt;

        let mut message_stream = self.consumer.stream();
        let mut batch: Vec<PendingMessage> = Vec::with_capacity(self.config.batch_size);
        let mut tracker =
            RedeliveryTracker::new(self.config.max_redelivery, self.config.redelivery_backoff);
        let mut awaiting_ack = false;
        let mut flush_timer = tokio::time::interval(self.config.batch_timeout);
        flush_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // Skip the first tick immediately
        flush_timer.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Consumer received shutdown signal");
                    // Uncommitted messages are re-read from the last committed offset on restart.
                    let _ = sender.send(StreamMessage::End).await;
                    break;
                }
                ack_msg = ack_receiver.recv() => {
                    match ack_msg {
                        Some(StreamMessage::Acknowledgment { offsets, success, error }) => {
                            awaiting_ack = false;
                            let keep_running = match self
                                .handle_acknowledgment(&mut tracker, offsets, success, error, &mut shutdown)
                                .await
                            {
                                Ok(keep_running) => keep_running,
                                Err(e) => {
                                    // Offsets are in an unknown state; stop and let a restart resume from the last commit.
                                    error!(error = %e, "Failed to settle batch, stopping consumer");
                                    let _ = sender.send(StreamMessage::Error(e.to_string())).await;
                                    return Err(e);
                                }
                            };
                            if !keep_running {
                                info!("Consumer received shutdown signal during redelivery backoff");
                                let _ = sender.send(StreamMessage::End).await;
                                break;
                            }
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Acknowledgment channel closed");
                            break;
                        }
                        _ => {
                            // Ignore other message types
                        }
                    }
                }
                message = message_stream.next(), if !awaiting_ack => {
                    match message {
                        Some(Ok(msg)) => {
                            batch.push(pending_from(&msg));
                            if batch.len() >= self.config.batch_size {
                                self.flush_batch(&mut batch, &sender).await?;
                                awaiting_ack = true;
                            }
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Kafka error");
                            let _ = sender.send(StreamMessage::Error(e.to_string())).await;
                        }
                        None => {
                            info!("Kafka stream ended");
                            if !batch.is_empty() {
                                self.flush_batch(&mut batch, &sender).await?;
                            }
                            let _ = sender.send(StreamMessage::End).await;
                            break;
                        }
                    }
                }
                _ = flush_timer.tick(), if !awaiting_ack => {
                    if !batch.is_empty() {
                        debug!(count = batch.len(), "Flushing batch due to timeout");
                        self.flush_batch(&mut batch, &sender).await?;
                        awaiting_ack = true;
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn offset(partition: i32, offset: i64) -> MessageOffset {
        ("canal.emshop_goods_srv".to_string(), partition, offset)
    }

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_BATCH_SIZE, 50);
        assert_eq!(DEFAULT_BATCH_TIMEOUT_MS, 1000);
        assert_eq!(DEFAULT_MAX_REDELIVERY, 16);
    }

    #[test]
    fn test_config_defaults() {
        let config = KafkaConsumerConfig::new("localhost:9092", "catalog-sync", "canal.goods");
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.max_redelivery, DEFAULT_MAX_REDELIVERY);
        assert_eq!(config.topic, "canal.goods");
    }

    #[test]
    fn test_decode_payload() {
        let payload = json!({
            "database": "emshop_goods_srv",
            "table": "goods",
            "type": "INSERT",
            "data": [{ "id": "1" }],
            "old": null,
            "isDdl": false
        })
        .to_string();

        let event = decode_payload(Some(payload.as_bytes())).unwrap();
        assert_eq!(event.table, "goods");

        assert!(decode_payload(None).is_none());
        assert!(decode_payload(Some(b"")).is_none());
        assert!(decode_payload(Some(b"not json")).is_none());
    }

    #[test]
    fn test_redelivery_rewinds_to_first_offset_per_partition() {
        let mut tracker = RedeliveryTracker::new(3, Duration::from_millis(100));
        let offsets = vec![offset(0, 12), offset(1, 7), offset(0, 10), offset(1, 8)];

        let decision = tracker.on_failure(&offsets);

        assert_eq!(
            decision,
            RedeliveryDecision::Retry {
                attempt: 1,
                backoff: Duration::from_millis(100),
                rewind: vec![offset(0, 10), offset(1, 7)],
            }
        );
    }

    #[test]
    fn test_redelivery_backoff_grows_then_dead_letters() {
        let mut tracker = RedeliveryTracker::new(3, Duration::from_millis(100));
        let offsets = vec![offset(0, 10), offset(0, 11)];

        let backoffs: Vec<Duration> = (0..3)
            .map(|_| match tracker.on_failure(&offsets) {
                RedeliveryDecision::Retry { backoff, .. } => backoff,
                other => panic!("unexpected decision {:?}", other),
            })
            .collect();
        assert_eq!(
            backoffs,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400)
            ]
        );

        assert_eq!(
            tracker.on_failure(&offsets),
            RedeliveryDecision::DeadLetter { attempts: 3 }
        );
        // The budget starts over once the batch has been dead-lettered.
        assert!(matches!(
            tracker.on_failure(&offsets),
            RedeliveryDecision::Retry { attempt: 1, .. }
        ));
    }

    #[test]
    fn test_success_resets_attempts() {
        let mut tracker = RedeliveryTracker::new(1, Duration::from_millis(10));
        let offsets = vec![offset(0, 5)];

        tracker.on_failure(&offsets);
        tracker.on_success(&offsets);

        assert!(matches!(
            tracker.on_failure(&offsets),
            RedeliveryDecision::Retry { attempt: 1, .. }
        ));
    }

    #[test]
    fn test_new_batch_on_partition_restarts_count() {
        let mut tracker = RedeliveryTracker::new(5, Duration::from_millis(10));

        tracker.on_failure(&[offset(0, 5)]);
        tracker.on_failure(&[offset(0, 5)]);

        assert!(matches!(
            tracker.on_failure(&[offset(0, 9)]),
            RedeliveryDecision::Retry { attempt: 1, .. }
        ));
    }

    #[test]
    fn test_backoff_is_capped() {
        let tracker = RedeliveryTracker::new(64, Duration::from_secs(1));
        assert_eq!(tracker.backoff(40), MAX_REDELIVERY_BACKOFF);
        assert_eq!(tracker.backoff(3), Duration::from_secs(4));
    }
}
