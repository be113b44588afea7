//! Consumer module for the change-event ingest.
//!
//! Provides the Kafka consumer that receives the catalog's change events.

mod kafka_consumer;
mod messages;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use crate::errors::IngestError;

pub use kafka_consumer::{
    KafkaConsumer, KafkaConsumerConfig, RedeliveryDecision, RedeliveryTracker,
    DEFAULT_MAX_REDELIVERY, DEFAULT_REDELIVERY_BACKOFF_MS,
};
pub use messages::{MessageOffset, StreamMessage};

/// A source of change event batches.
///
/// `run` sends [`StreamMessage::Events`] on `sender`, waits for a matching
/// [`StreamMessage::Acknowledgment`] on `ack_receiver`, and stops on `shutdown`.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Subscribe to the configured topics.
    fn subscribe(&self) -> Result<(), IngestError>;

    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        ack_receiver: mpsc::Receiver<StreamMessage>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError>;
}
