//! Shared HTTP client and tokio runtime.
//!
//! Requests run on async reqwest, but callers see a blocking interface:
//! the pipeline is strictly sequential and only ever has one request in
//! flight.

use std::sync::LazyLock;
use std::time::Duration;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
});

/// Get shared HTTP client.
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// `User-Agent` for polite API access: `name/version (mailto:addr)`.
pub fn user_agent(mailto: Option<&str>) -> String {
    let base = concat!("doiline/", env!("CARGO_PKG_VERSION"));
    match mailto {
        Some(addr) if !addr.is_empty() => format!("{base} (mailto:{addr})"),
        _ => base.to_string(),
    }
}
