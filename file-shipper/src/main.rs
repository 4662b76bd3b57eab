//! Ship the lines of every file under a directory to Kafka, spilling the rest to fallback files.
use std::sync::Arc;

use anyhow::{Context, Result};
use envconfig::Envconfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use file_shipper::config::Config;
use file_shipper::pipeline::Pipeline;
use file_shipper::sinks::kafka::KafkaSink;
use file_shipper::sinks::{PrintSink, Publisher};

fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

fn main() -> Result<()> {
    setup_tracing();
    info!("Starting up...");

    let config = Config::init_from_env().context("Invalid configuration")?;
    let filter = config
        .line_filter()
        .context("Invalid LINE_FILTER_PATTERN")?;

    let publisher: Arc<dyn Publisher> = if config.print_sink {
        Arc::new(PrintSink)
    } else {
        Arc::new(KafkaSink::new(&config.kafka).context("Failed to connect to Kafka")?)
    };

    let mut pipeline = Pipeline::from_config(&config, publisher)?;
    let summary = pipeline.run(&config.source_dir(), config.lookup_depth, &filter)?;

    info!(
        files = summary.files_discovered,
        failed = summary.files_failed,
        published = summary.lines_published,
        fallback = summary.lines_fallback,
        "Shutting down"
    );

    Ok(())
}
