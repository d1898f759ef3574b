//! Doiline Core - Common infrastructure for metadata fetch pipelines
//!
//! Shared HTTP plumbing, retry with exponential backoff, logging,
//! progress display and graceful shutdown used by the registry crates.

pub mod error;
pub mod http;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod shutdown;

// Re-exports for convenience
pub use error::FetchError;
pub use http::{SHARED_RUNTIME, http_client};
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use retry::{Exhausted, RetryPolicy, Sleeper, ThreadSleeper, retry_with_backoff};
pub use shutdown::{install_signal_handlers, is_shutdown_requested, request_shutdown, shutdown_flag};
