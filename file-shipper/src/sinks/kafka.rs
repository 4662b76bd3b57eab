use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use common_kafka::config::KafkaConfig;
use common_kafka::kafka_producer::{create_kafka_producer, KafkaContext};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{BaseRecord, Producer, ThreadedProducer};
use tracing::{info, warn};

use crate::error::PublishError;
use crate::sinks::Publisher;

pub struct KafkaSink {
    producer: ThreadedProducer<KafkaContext>,
    flush_timeout: Duration,
    closed: AtomicBool,
}

impl KafkaSink {
    pub fn new(config: &KafkaConfig) -> Result<KafkaSink, KafkaError> {
        info!("connecting to Kafka brokers at {}...", config.kafka_hosts);
        let producer = create_kafka_producer(config)?;
        info!("connected to Kafka brokers");

        Ok(KafkaSink::from_producer(producer, config.flush_timeout()))
    }

    pub fn from_producer(
        producer: ThreadedProducer<KafkaContext>,
        flush_timeout: Duration,
    ) -> Self {
        KafkaSink {
            producer,
            flush_timeout,
            closed: AtomicBool::new(false),
        }
    }
}

impl Publisher for KafkaSink {
    fn publish(&self, topic: &str, key: &str, value: &str) -> Result<(), PublishError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PublishError::Closed);
        }

        // Only the enqueue is checked here, delivery is reported to the producer context
        self.producer
            .send(BaseRecord::to(topic).key(key).payload(value))
            .map_err(|(err, _)| {
                if let Some(RDKafkaErrorCode::MessageSizeTooLarge) = err.rdkafka_error_code() {
                    warn!(key, "line is too large for a Kafka message");
                }
                PublishError::Enqueue(err)
            })
    }

    fn close(&self) -> Result<(), PublishError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!(
            in_flight = self.producer.in_flight_count(),
            "flushing Kafka producer"
        );
        self.producer
            .flush(self.flush_timeout)
            .map_err(PublishError::Flush)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_kafka::test::mock_config;
    use rdkafka::consumer::{BaseConsumer, Consumer};
    use rdkafka::message::Message;
    use rdkafka::mocking::MockCluster;
    use rdkafka::producer::DefaultProducerContext;
    use rdkafka::ClientConfig;

    fn start_on_mocked_sink(
        config: impl FnOnce(&mut KafkaConfig),
    ) -> (MockCluster<'static, DefaultProducerContext>, KafkaSink) {
        let cluster = MockCluster::new(1).expect("failed to create mock brokers");
        let mut kafka_config = mock_config(cluster.bootstrap_servers());
        config(&mut kafka_config);
        let sink = KafkaSink::new(&kafka_config).expect("failed to create sink");
        (cluster, sink)
    }

    #[test]
    fn kafka_sink_publishes_keyed_lines() {
        let (cluster, sink) = start_on_mocked_sink(|_| {});
        cluster
            .create_topic("file_lines", 1, 1)
            .expect("failed to create mock topic");

        let line = "\u{1}abc\u{2}rest-of-line-1";
        sink.publish("file_lines", "abc", line)
            .expect("failed to enqueue line");
        sink.close().expect("failed to flush producer");

        let consumer: BaseConsumer = ClientConfig::new()
            .set("bootstrap.servers", cluster.bootstrap_servers())
            .set("group.id", "file_shipper_test")
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", "false")
            .create()
            .expect("failed to create consumer");
        consumer
            .subscribe(&["file_lines"])
            .expect("failed to subscribe to test topic");

        let mut received = None;
        for _ in 0..100 {
            if let Some(message) = consumer.poll(Duration::from_millis(100)) {
                let message = message.expect("failed to receive message");
                received = Some((
                    message.key().map(|k| k.to_vec()),
                    message.payload().map(|p| p.to_vec()),
                ));
                break;
            }
        }

        let (key, payload) = received.expect("timed out waiting for message");
        assert_eq!(key.as_deref(), Some("abc".as_bytes()));
        assert_eq!(payload.as_deref(), Some(line.as_bytes()));
    }

    #[test]
    fn kafka_sink_reports_full_queue() {
        // Hold messages in the local queue long enough to fill it
        let (_cluster, sink) = start_on_mocked_sink(|config| {
            config.kafka_producer_queue_messages = 1;
            config.kafka_producer_linger_ms = 10000;
            config.kafka_message_timeout_ms = 20000;
        });

        sink.publish("file_lines", "k", "first")
            .expect("failed to enqueue first line");
        match sink.publish("file_lines", "k", "second") {
            Err(PublishError::Enqueue(err)) => {
                assert_eq!(err.rdkafka_error_code(), Some(RDKafkaErrorCode::QueueFull))
            }
            other => panic!("expected a full queue, got {other:?}"),
        }
    }

    #[test]
    fn kafka_sink_rejects_lines_after_close() {
        let (_cluster, sink) = start_on_mocked_sink(|_| {});
        sink.close().expect("failed to flush producer");
        sink.close().expect("second close should be a no-op");

        assert!(matches!(
            sink.publish("file_lines", "k", "late"),
            Err(PublishError::Closed)
        ));
    }
}
