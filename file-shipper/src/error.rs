use std::io;
use std::path::PathBuf;

use rdkafka::error::KafkaError;
use thiserror::Error;

use crate::pipeline::PipelineState;

/// Errors returned by a `Publisher`. None of these escape line routing: a failed
/// publish sends the line to its fallback file instead.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("failed to enqueue message for Kafka: {0}")]
    Enqueue(KafkaError),
    #[error("failed to flush Kafka producer: {0}")]
    Flush(KafkaError),
    #[error("failed to write to stdout: {0}")]
    Stdout(#[from] io::Error),
    #[error("publisher is closed")]
    Closed,
}

/// A file whose lines could not be loaded. Lines routed before the failure stay routed.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("panic while processing the lines of {}", path.display())]
    Panicked { path: PathBuf },
}

/// Errors related to driving the pipeline itself, as opposed to the data moving through it.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("pipeline cannot run from state {0:?}")]
    InvalidState(PipelineState),
    #[error("failed to build line worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Failures while discovering files. The walker logs these and reports no files.
#[derive(Error, Debug)]
pub enum TraversalError {
    #[error("cannot resolve root directory {}: {source}", path.display())]
    Root { path: PathBuf, source: io::Error },
    #[error("failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),
}
