//! Per-source-file spill files for lines that could not be published.
//!
//! Each source file gets at most one fallback stream, opened the first time one of its
//! lines needs it and kept until `close_all`. Nothing here returns an error to the
//! caller: when a line cannot be persisted it is written to the logs instead.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::mapref::one::Ref;
use dashmap::DashMap;
use metrics::counter;
use tracing::{error, info};

use crate::metrics_consts::{FALLBACK_STREAMS_COUNTER, FALLBACK_WRITE_ERRORS_COUNTER};
use crate::walker::SourceFile;

pub const FALLBACK_FILE_PREFIX: &str = "except";

pub type FallbackWriter = Box<dyn Write + Send>;

/// Opens the stream backing a fallback file.
pub type StreamOpener = Arc<dyn Fn(&Path) -> io::Result<FallbackWriter> + Send + Sync>;

enum FallbackSlot {
    Open(Mutex<FallbackWriter>),
    // Opening failed once, so lines for this source only go to the logs from now on
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackWrite {
    Persisted,
    LoggedOnly,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CloseReport {
    pub closed: usize,
    pub failed: usize,
}

/// Location of the fallback file for `source`: every path separator becomes a `.`,
/// so `/data/logs/part-00000` maps to `{root}/except.data.logs.part-00000`.
///
/// The name is assembled from the raw components, so paths that are not valid
/// UTF-8 keep distinct fallback files.
pub fn fallback_path(root: &Path, source: &Path) -> PathBuf {
    let mut name = OsString::from(FALLBACK_FILE_PREFIX);
    let mut after_name = false;
    for component in source.components() {
        if after_name {
            name.push(".");
        }
        after_name = match component {
            Component::RootDir => {
                name.push(".");
                false
            }
            Component::Prefix(_) => {
                name.push(component);
                false
            }
            _ => {
                name.push(component);
                true
            }
        };
    }
    root.join(name)
}

fn open_file_stream(path: &Path) -> io::Result<FallbackWriter> {
    Ok(Box::new(BufWriter::new(File::create(path)?)))
}

pub struct FallbackRegistry {
    root: PathBuf,
    streams: DashMap<PathBuf, FallbackSlot>,
    opener: StreamOpener,
}

impl FallbackRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_opener(root, Arc::new(open_file_stream))
    }

    pub fn with_opener(root: impl Into<PathBuf>, opener: StreamOpener) -> Self {
        Self {
            root: root.into(),
            streams: DashMap::new(),
            opener,
        }
    }

    /// Appends `line` and a newline to the fallback stream of `source`.
    pub fn write(&self, source: &SourceFile, line: &str) -> FallbackWrite {
        let slot = self.slot(source);
        let result = match slot.value() {
            FallbackSlot::Open(stream) => {
                let mut stream = stream.lock().unwrap_or_else(PoisonError::into_inner);
                stream
                    .write_all(line.as_bytes())
                    .and_then(|_| stream.write_all(b"\n"))
            }
            FallbackSlot::Unavailable => Err(io::Error::other("no fallback stream")),
        };

        match result {
            Ok(()) => FallbackWrite::Persisted,
            Err(_) => {
                counter!(FALLBACK_WRITE_ERRORS_COUNTER).increment(1);
                info!(
                    "file exception line {} :\t {}",
                    source.path().display(),
                    line
                );
                FallbackWrite::LoggedOnly
            }
        }
    }

    // Holding the shard lock while opening makes the first writer the only one to open
    fn slot(&self, source: &SourceFile) -> Ref<'_, PathBuf, FallbackSlot> {
        if let Some(slot) = self.streams.get(source.path()) {
            return slot;
        }
        self.streams
            .entry(source.path().to_path_buf())
            .or_insert_with(|| self.open_slot(source.path()))
            .downgrade()
    }

    fn open_slot(&self, source: &Path) -> FallbackSlot {
        let path = fallback_path(&self.root, source);
        match (self.opener)(&path) {
            Ok(stream) => {
                counter!(FALLBACK_STREAMS_COUNTER).increment(1);
                info!(
                    "exception file {} for data file {}",
                    path.display(),
                    source.display()
                );
                FallbackSlot::Open(Mutex::new(stream))
            }
            Err(err) => {
                error!(
                    "create filewriter {} for data file {} error: {}",
                    path.display(),
                    source.display(),
                    err
                );
                FallbackSlot::Unavailable
            }
        }
    }

    /// Number of source files that have an open fallback stream.
    pub fn open_streams(&self) -> usize {
        self.streams
            .iter()
            .filter(|entry| matches!(entry.value(), FallbackSlot::Open(_)))
            .count()
    }

    /// Flushes and drops every stream. A stream that fails to flush is logged and
    /// does not stop the others from closing. Calling this again is a no-op.
    pub fn close_all(&self) -> CloseReport {
        let mut report = CloseReport::default();
        let sources: Vec<PathBuf> = self.streams.iter().map(|e| e.key().clone()).collect();

        for source in sources {
            let Some((source, FallbackSlot::Open(stream))) = self.streams.remove(&source) else {
                continue;
            };
            let mut stream = stream.into_inner().unwrap_or_else(PoisonError::into_inner);
            match stream.flush() {
                Ok(()) => report.closed += 1,
                Err(err) => {
                    error!("close filewriter {} error: {}", source.display(), err);
                    report.failed += 1;
                }
            }
        }

        report
    }
}
