use std::time::Duration;

use metrics::{counter, gauge};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::producer::{DeliveryResult, Producer, ProducerContext, ThreadedProducer};
use rdkafka::{ClientConfig, ClientContext};
use tracing::{debug, error, info};

use crate::config::KafkaConfig;

pub const DELIVERY_ERRORS_COUNTER: &str = "kafka_producer_delivery_errors_total";
pub const DELIVERED_MESSAGES_COUNTER: &str = "kafka_producer_delivered_total";

/// Producer context shared by every message produced through `create_kafka_producer`.
///
/// Sends are fire-and-forget, so the delivery callback is the only place a broker-side
/// failure becomes visible. It is recorded and logged, never retried.
#[derive(Default)]
pub struct KafkaContext {}

impl ClientContext for KafkaContext {
    fn stats(&self, stats: rdkafka::Statistics) {
        gauge!("kafka_producer_callback_queue_depth").set(stats.replyq as f64);
        gauge!("kafka_producer_queue_depth").set(stats.msg_cnt as f64);
        gauge!("kafka_producer_queue_depth_limit").set(stats.msg_max as f64);
        gauge!("kafka_producer_queue_bytes").set(stats.msg_size as f64);
        gauge!("kafka_producer_queue_bytes_limit").set(stats.msg_size_max as f64);
    }
}

impl ProducerContext for KafkaContext {
    type DeliveryOpaque = ();

    fn delivery(&self, delivery_result: &DeliveryResult<'_>, _: Self::DeliveryOpaque) {
        match delivery_result {
            Ok(_) => counter!(DELIVERED_MESSAGES_COUNTER).increment(1),
            Err((err, message)) => {
                counter!(DELIVERY_ERRORS_COUNTER).increment(1);
                let key = message
                    .key()
                    .map(String::from_utf8_lossy)
                    .unwrap_or_default();
                error!(
                    topic = message.topic(),
                    key = %key,
                    "failed to deliver message to Kafka: {}",
                    err
                );
            }
        }
    }
}

pub fn producer_client_config(config: &KafkaConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", &config.kafka_hosts)
        .set("statistics.interval.ms", "10000")
        .set("linger.ms", config.kafka_producer_linger_ms.to_string())
        .set("batch.size", config.kafka_producer_batch_size.to_string())
        .set(
            "message.timeout.ms",
            config.kafka_message_timeout_ms.to_string(),
        )
        .set(
            "compression.codec",
            config.kafka_compression_codec.to_owned(),
        )
        .set(
            "queue.buffering.max.kbytes",
            (config.kafka_producer_queue_mib * 1024).to_string(),
        )
        .set(
            "queue.buffering.max.messages",
            config.kafka_producer_queue_messages.to_string(),
        )
        .set("acks", config.kafka_acks.to_owned())
        .set("retries", config.kafka_retries.to_string());

    if config.kafka_tls {
        client_config
            .set("security.protocol", "ssl")
            .set("enable.ssl.certificate.verification", "false");
    };

    client_config
}

/// Builds a producer that polls for delivery reports on its own background thread,
/// so it can be shared by plain OS threads without an async runtime.
pub fn create_kafka_producer(
    config: &KafkaConfig,
) -> Result<ThreadedProducer<KafkaContext>, KafkaError> {
    let client_config = producer_client_config(config);

    debug!("rdkafka configuration: {:?}", client_config);
    let producer: ThreadedProducer<KafkaContext> =
        client_config.create_with_context(KafkaContext::default())?;

    // "Ping" the Kafka brokers by requesting metadata
    match producer
        .client()
        .fetch_metadata(None, Duration::from_secs(10))
    {
        Ok(metadata) => {
            info!(
                "Successfully connected to Kafka brokers. Found {} topics.",
                metadata.topics().len()
            );
        }
        Err(error) => {
            error!("Failed to fetch metadata from Kafka brokers: {:?}", error);
            return Err(error);
        }
    }

    Ok(producer)
}
