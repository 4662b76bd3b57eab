use std::path::Path;
use std::sync::Arc;

use metrics::counter;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::PipelineError;
use crate::fallback::FallbackRegistry;
use crate::filter::LineFilter;
use crate::metrics_consts::{
    FILES_FAILED_COUNTER, FILES_PROCESSED_COUNTER, LINES_FILTERED_COUNTER,
};
use crate::processor::{process_file, FileSummary};
use crate::router::LineRouter;
use crate::sinks::Publisher;
use crate::walker::list_files;

const LOG_PREFIX_WHOLE_FILE_ERROR: &str = "whole file to kafka error";

/// States only move forward: Idle, Walking, Processing, ShuttingDown, Closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Walking,
    Processing,
    ShuttingDown,
    Closed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub files_discovered: usize,
    pub files_processed: usize,
    pub files_failed: usize,
    pub lines_published: usize,
    pub lines_fallback: usize,
    /// Fallback lines that only reached the logs.
    pub lines_logged_only: usize,
    pub lines_filtered: usize,
}

impl RunSummary {
    fn record_file(&mut self, file: FileSummary) {
        self.files_processed += 1;
        self.lines_published += file.published;
        self.lines_fallback += file.fallback;
        self.lines_logged_only += file.logged_only;
        self.lines_filtered += file.filtered;
    }
}

/// Owns the publisher, the fallback streams and the line worker pool for one run.
///
/// Files are processed one after another, the lines of each file in parallel.
/// Whatever happens to a file or a line, `run` finishes by closing every fallback
/// stream and then the publisher. Dropping a pipeline that never ran does the same.
pub struct Pipeline {
    state: PipelineState,
    router: LineRouter,
    fallback: Arc<FallbackRegistry>,
    publisher: Arc<dyn Publisher>,
    pool: rayon::ThreadPool,
}

impl Pipeline {
    pub fn new(
        topic: impl Into<String>,
        publisher: Arc<dyn Publisher>,
        fallback: FallbackRegistry,
        worker_threads: usize,
    ) -> Result<Self, PipelineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|i| format!("line-worker-{i}"))
            .build()?;
        let fallback = Arc::new(fallback);
        let router = LineRouter::new(topic, publisher.clone(), fallback.clone());

        Ok(Self {
            state: PipelineState::Idle,
            router,
            fallback,
            publisher,
            pool,
        })
    }

    pub fn from_config(
        config: &Config,
        publisher: Arc<dyn Publisher>,
    ) -> Result<Self, PipelineError> {
        Self::new(
            config.kafka_topic.clone(),
            publisher,
            FallbackRegistry::new(config.fallback_dir()),
            config.worker_threads(),
        )
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Routes every line of every file found under `directory`, then shuts down.
    ///
    /// Only misuse is reported as an error: file and line failures are logged or
    /// written to fallback files, and show up in the returned summary.
    pub fn run(
        &mut self,
        directory: &Path,
        depth: usize,
        filter: &LineFilter,
    ) -> Result<RunSummary, PipelineError> {
        if self.state != PipelineState::Idle {
            return Err(PipelineError::InvalidState(self.state));
        }

        self.state = PipelineState::Walking;
        let files = list_files(directory, depth);
        info!(
            directory = %directory.display(),
            depth,
            "processing {} files",
            files.len()
        );

        self.state = PipelineState::Processing;
        let mut summary = RunSummary {
            files_discovered: files.len(),
            ..Default::default()
        };
        for file in &files {
            let router = &self.router;
            match self.pool.install(|| process_file(file, filter, router)) {
                Ok(file_summary) => {
                    counter!(FILES_PROCESSED_COUNTER).increment(1);
                    counter!(LINES_FILTERED_COUNTER).increment(file_summary.filtered as u64);
                    info!(
                        file = %file.path().display(),
                        published = file_summary.published,
                        fallback = file_summary.fallback,
                        logged_only = file_summary.logged_only,
                        filtered = file_summary.filtered,
                        "processed file"
                    );
                    summary.record_file(file_summary);
                }
                Err(err) => {
                    counter!(FILES_FAILED_COUNTER).increment(1);
                    error!(
                        "{} {}: {}",
                        LOG_PREFIX_WHOLE_FILE_ERROR,
                        file.path().display(),
                        err
                    );
                    summary.files_failed += 1;
                }
            }
        }

        self.shutdown();
        info!(?summary, "run complete");
        Ok(summary)
    }

    /// Closes every fallback stream, then the publisher. Safe to call more than once.
    pub fn shutdown(&mut self) {
        match self.state {
            PipelineState::ShuttingDown | PipelineState::Closed => return,
            PipelineState::Walking | PipelineState::Processing => {
                warn!(state = ?self.state, "shutting down before all files were processed");
            }
            PipelineState::Idle => {}
        }

        self.state = PipelineState::ShuttingDown;
        let report = self.fallback.close_all();
        info!(
            closed = report.closed,
            failed = report.failed,
            "closed fallback streams"
        );

        if let Err(err) = self.publisher.close() {
            error!("failed to close publisher: {}", err);
        }
        self.state = PipelineState::Closed;
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FailingSink, RecordingSink};
    use tempfile::TempDir;

    fn pipeline(sink: Arc<dyn Publisher>, fallback_dir: &Path) -> Pipeline {
        Pipeline::new("file_lines", sink, FallbackRegistry::new(fallback_dir), 2).unwrap()
    }

    #[test]
    fn test_states_move_forward() {
        let temp_dir = TempDir::new().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let mut pipeline = pipeline(sink.clone(), temp_dir.path());
        assert_eq!(pipeline.state(), PipelineState::Idle);

        pipeline
            .run(temp_dir.path(), 1, &LineFilter::AcceptAll)
            .unwrap();
        assert_eq!(pipeline.state(), PipelineState::Closed);

        assert!(matches!(
            pipeline.run(temp_dir.path(), 1, &LineFilter::AcceptAll),
            Err(PipelineError::InvalidState(PipelineState::Closed))
        ));
    }

    #[test]
    fn test_publisher_closed_exactly_once() {
        let temp_dir = TempDir::new().unwrap();
        let sink = Arc::new(RecordingSink::default());

        let mut pipeline = pipeline(sink.clone(), temp_dir.path());
        pipeline
            .run(temp_dir.path(), 1, &LineFilter::AcceptAll)
            .unwrap();
        pipeline.shutdown();
        drop(pipeline);

        assert_eq!(sink.close_count(), 1);
    }

    #[test]
    fn test_drop_shuts_down_unused_pipeline() {
        let temp_dir = TempDir::new().unwrap();
        let sink = Arc::new(RecordingSink::default());

        drop(pipeline(sink.clone(), temp_dir.path()));

        assert_eq!(sink.close_count(), 1);
    }

    #[test]
    fn test_publisher_close_failure_is_absorbed() {
        let temp_dir = TempDir::new().unwrap();
        let mut pipeline = pipeline(Arc::new(FailingSink), temp_dir.path());

        pipeline.shutdown();

        assert_eq!(pipeline.state(), PipelineState::Closed);
    }
}
