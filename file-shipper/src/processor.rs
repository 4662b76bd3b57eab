use std::fs;
use std::ops::AddAssign;
use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;

use crate::error::FileError;
use crate::fallback::FallbackWrite;
use crate::filter::LineFilter;
use crate::router::{LineRouter, RouteOutcome};
use crate::walker::SourceFile;

/// Line counts for one processed file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FileSummary {
    pub published: usize,
    pub fallback: usize,
    /// Fallback lines that could not be written to a fallback file.
    pub logged_only: usize,
    pub filtered: usize,
}

impl AddAssign for FileSummary {
    fn add_assign(&mut self, other: Self) {
        self.published += other.published;
        self.fallback += other.fallback;
        self.logged_only += other.logged_only;
        self.filtered += other.filtered;
    }
}

impl FileSummary {
    fn merge(mut self, other: Self) -> Self {
        self += other;
        self
    }

    fn from_line(outcome: Option<RouteOutcome>) -> Self {
        match outcome {
            None => FileSummary {
                filtered: 1,
                ..Default::default()
            },
            Some(RouteOutcome::Published) => FileSummary {
                published: 1,
                ..Default::default()
            },
            Some(RouteOutcome::Fallback(_, written)) => FileSummary {
                fallback: 1,
                logged_only: usize::from(written == FallbackWrite::LoggedOnly),
                ..Default::default()
            },
        }
    }
}

/// Splits on `\n`, `\r\n` and a lone `\r`. A terminator at the very end does not
/// start another line.
fn split_lines(content: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = content;
    while !rest.is_empty() {
        match rest.find(['\n', '\r']) {
            Some(end) => {
                lines.push(&rest[..end]);
                let next = if rest[end..].starts_with("\r\n") {
                    end + 2
                } else {
                    end + 1
                };
                rest = &rest[next..];
            }
            None => {
                lines.push(rest);
                break;
            }
        }
    }
    lines
}

/// Loads the whole file and routes its accepted lines in parallel, in no particular order.
///
/// Runs on the current rayon pool. The file is buffered in memory before any line is
/// routed, so a file that cannot be read fails before anything was sent. A panic outside
/// the router, such as in a custom filter, fails the file; lines already routed stay routed.
pub fn process_file(
    source: &SourceFile,
    filter: &LineFilter,
    router: &LineRouter,
) -> Result<FileSummary, FileError> {
    let content = fs::read_to_string(source.path()).map_err(|err| FileError::Read {
        path: source.path().to_path_buf(),
        source: err,
    })?;
    let lines = split_lines(&content);

    catch_unwind(AssertUnwindSafe(|| {
        lines
            .par_iter()
            .map(|line| {
                let outcome = filter.accepts(line).then(|| router.route(source, line));
                FileSummary::from_line(outcome)
            })
            .reduce(FileSummary::default, FileSummary::merge)
    }))
    .map_err(|_| FileError::Panicked {
        path: source.path().to_path_buf(),
    })
}
