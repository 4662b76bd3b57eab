use std::path::PathBuf;

use envconfig::Envconfig;
use regex::Regex;

pub use common_kafka::config::KafkaConfig;

use crate::filter::LineFilter;

#[derive(Envconfig, Clone)]
pub struct Config {
    pub source_dir: String,

    // 0 only looks at SOURCE_DIR itself, 1 at its direct children, and so on
    #[envconfig(default = "1")]
    pub lookup_depth: usize,

    #[envconfig(default = "/tmp")]
    pub fallback_dir: String,

    #[envconfig(default = "file_lines")]
    pub kafka_topic: String,

    // When set, only lines matching this regex are routed
    pub line_filter_pattern: Option<String>,

    // 0 means one worker per available core
    #[envconfig(default = "0")]
    pub worker_threads: usize,

    // Print lines to stdout instead of producing them, handy for dry runs
    #[envconfig(default = "false")]
    pub print_sink: bool,

    #[envconfig(nested = true)]
    pub kafka: KafkaConfig,
}

impl Config {
    pub fn source_dir(&self) -> PathBuf {
        PathBuf::from(&self.source_dir)
    }

    pub fn fallback_dir(&self) -> PathBuf {
        PathBuf::from(&self.fallback_dir)
    }

    pub fn line_filter(&self) -> Result<LineFilter, regex::Error> {
        match self.line_filter_pattern.as_deref() {
            None | Some("") => Ok(LineFilter::AcceptAll),
            Some(pattern) => Ok(LineFilter::Matching(Regex::new(pattern)?)),
        }
    }

    pub fn worker_threads(&self) -> usize {
        resolve_worker_threads(self.worker_threads, available_parallelism())
    }
}

/// Number of line workers to start: the configured count, capped at what the host offers.
fn resolve_worker_threads(requested: usize, available: usize) -> usize {
    match requested {
        0 => available,
        n if n > available => {
            tracing::warn!(
                requested = n,
                available,
                "WORKER_THREADS exceeds available parallelism, capping"
            );
            available
        }
        n => n,
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or_else(|_| {
            tracing::warn!("Failed to determine available parallelism, falling back to 1");
            1
        })
}
