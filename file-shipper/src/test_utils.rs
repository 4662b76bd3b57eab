use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use rdkafka::error::{KafkaError, RDKafkaErrorCode};

use crate::error::PublishError;
use crate::sinks::Publisher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub key: String,
    pub value: String,
}

/// Keeps every published message in memory.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<PublishedMessage>>,
    closes: AtomicUsize,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Publisher for RecordingSink {
    fn publish(&self, topic: &str, key: &str, value: &str) -> Result<(), PublishError> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PublishedMessage {
                topic: topic.to_string(),
                key: key.to_string(),
                value: value.to_string(),
            });
        Ok(())
    }

    fn close(&self) -> Result<(), PublishError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Rejects every message as if the producer queue were full, and fails to close.
pub struct FailingSink;

impl Publisher for FailingSink {
    fn publish(&self, _: &str, _: &str, _: &str) -> Result<(), PublishError> {
        Err(PublishError::Enqueue(KafkaError::MessageProduction(
            RDKafkaErrorCode::QueueFull,
        )))
    }

    fn close(&self) -> Result<(), PublishError> {
        Err(PublishError::Flush(KafkaError::Flush(
            RDKafkaErrorCode::OperationTimedOut,
        )))
    }
}
