pub mod config;
pub mod error;
pub mod fallback;
pub mod filter;
pub mod metrics_consts;
pub mod pipeline;
pub mod processor;
pub mod router;
pub mod sinks;
pub mod test_utils;
pub mod walker;
