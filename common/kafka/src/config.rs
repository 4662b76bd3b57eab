use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct KafkaConfig {
    #[envconfig(default = "20")]
    pub kafka_producer_linger_ms: u32, // Maximum time between producer batches during low traffic

    #[envconfig(default = "65536")]
    pub kafka_producer_batch_size: u32, // Maximum size of a single produce batch, in bytes

    #[envconfig(default = "400")]
    pub kafka_producer_queue_mib: u32, // Size of the in-memory producer queue in mebibytes

    #[envconfig(default = "10000000")]
    pub kafka_producer_queue_messages: u32, // Maximum number of messages in the in-memory producer queue

    #[envconfig(default = "20000")]
    pub kafka_message_timeout_ms: u32, // Time before we stop trying to deliver a message: 20 seconds

    #[envconfig(default = "none")]
    pub kafka_compression_codec: String, // none, gzip, snappy, lz4, zstd

    #[envconfig(default = "all")]
    pub kafka_acks: String, // 0, 1, all

    // Lines that cannot be delivered end up in the fallback files, so retries stay off
    #[envconfig(default = "0")]
    pub kafka_retries: u32,

    #[envconfig(default = "30000")]
    pub kafka_flush_timeout_ms: u64, // Upper bound on draining the producer queue at shutdown

    #[envconfig(default = "false")]
    pub kafka_tls: bool,

    #[envconfig(default = "localhost:9092")]
    pub kafka_hosts: String,
}

impl KafkaConfig {
    pub fn flush_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.kafka_flush_timeout_ms)
    }
}
