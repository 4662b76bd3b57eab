use rdkafka::mocking::MockCluster;
use rdkafka::producer::{DefaultProducerContext, ThreadedProducer};

use crate::config::KafkaConfig;
use crate::kafka_producer::{create_kafka_producer, KafkaContext};

pub fn mock_config(kafka_hosts: String) -> KafkaConfig {
    KafkaConfig {
        kafka_producer_linger_ms: 0,
        kafka_producer_batch_size: 16384,
        kafka_producer_queue_mib: 50,
        kafka_producer_queue_messages: 1000,
        kafka_message_timeout_ms: 5000,
        kafka_compression_codec: "none".to_string(),
        kafka_acks: "all".to_string(),
        kafka_retries: 0,
        kafka_flush_timeout_ms: 5000,
        kafka_tls: false,
        kafka_hosts,
    }
}

pub fn create_mock_kafka() -> (
    MockCluster<'static, DefaultProducerContext>,
    ThreadedProducer<KafkaContext>,
) {
    let cluster = MockCluster::new(1).expect("failed to create mock brokers");
    let config = mock_config(cluster.bootstrap_servers());

    let producer = create_kafka_producer(&config).expect("failed to create mocked kafka producer");
    (cluster, producer)
}
