//! Message types for the consumer.
//!
//! Defines the messages that flow between the consumer and the orchestrator.

use catalog_sync_shared::ChangeEvent;

/// A Kafka position: topic, partition and offset of one message.
pub type MessageOffset = (String, i32, i64);

/// Messages that flow through the ingest.
#[derive(Debug)]
pub enum StreamMessage {
    /// A batch of change events with the offsets of every message in the batch.
    ///
    /// `offsets` also covers messages that carried no usable event, so acknowledging
    /// the batch commits past them.
    Events {
        events: Vec<ChangeEvent>,
        offsets: Vec<MessageOffset>,
    },
    /// Outcome of processing a batch. A failed batch is redelivered.
    Acknowledgment {
        offsets: Vec<MessageOffset>,
        success: bool,
        error: Option<String>,
    },
    /// Stream has ended.
    End,
    /// An error occurred.
    Error(String),
}
