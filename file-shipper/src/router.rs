use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, error};

use crate::fallback::{FallbackRegistry, FallbackWrite};
use crate::metrics_consts::{LINES_FALLBACK_COUNTER, LINES_PUBLISHED_COUNTER};
use crate::sinks::Publisher;
use crate::walker::SourceFile;

/// Marks the start of the routing key inside a line.
pub const KEY_START: u8 = 0o001;
/// Marks the end of the routing key inside a line.
pub const KEY_END: u8 = 0o002;

/// Returns the text strictly between the first `KEY_START` and the first `KEY_END`,
/// or `None` when either marker is missing or the end marker comes first.
pub fn extract_routing_key(line: &str) -> Option<&str> {
    let bytes = line.as_bytes();
    let start = bytes.iter().position(|&b| b == KEY_START)?;
    let end = bytes.iter().position(|&b| b == KEY_END)?;
    if start < end {
        // Both markers are ASCII, so these are char boundaries
        Some(&line[start + 1..end])
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    NoKey,
    PublishFailed,
    Panicked,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::NoKey => "no_key",
            FallbackReason::PublishFailed => "publish_failed",
            FallbackReason::Panicked => "panic",
        }
    }
}

/// Where a line ended up. A fallback line whose stream was unusable only reached the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Published,
    Fallback(FallbackReason, FallbackWrite),
}

/// Sends each line either to the publisher, keyed by its routing key, or to the
/// fallback file of its source. Routing never fails: whatever goes wrong with a
/// line stays with that line.
#[derive(Clone)]
pub struct LineRouter {
    topic: String,
    publisher: Arc<dyn Publisher>,
    fallback: Arc<FallbackRegistry>,
}

impl LineRouter {
    pub fn new(
        topic: impl Into<String>,
        publisher: Arc<dyn Publisher>,
        fallback: Arc<FallbackRegistry>,
    ) -> Self {
        Self {
            topic: topic.into(),
            publisher,
            fallback,
        }
    }

    pub fn route(&self, source: &SourceFile, line: &str) -> RouteOutcome {
        let reason = match catch_unwind(AssertUnwindSafe(|| self.publish(line))) {
            Ok(Ok(())) => {
                counter!(LINES_PUBLISHED_COUNTER).increment(1);
                return RouteOutcome::Published;
            }
            Ok(Err(reason)) => reason,
            Err(_) => {
                error!(
                    file = %source.path().display(),
                    "panic while routing line, writing it to the fallback file"
                );
                FallbackReason::Panicked
            }
        };

        let written = self.fallback.write(source, line);
        counter!(LINES_FALLBACK_COUNTER, "reason" => reason.as_str()).increment(1);
        RouteOutcome::Fallback(reason, written)
    }

    fn publish(&self, line: &str) -> Result<(), FallbackReason> {
        let key = extract_routing_key(line).ok_or(FallbackReason::NoKey)?;
        self.publisher
            .publish(&self.topic, key, line)
            .map_err(|err| {
                debug!(key, "failed to publish line: {}", err);
                FallbackReason::PublishFailed
            })
    }
}
