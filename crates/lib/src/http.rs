//! Shared reqwest client construction.

use std::time::Duration;

/// Build an HTTP client. `verify_ssl = false` accepts invalid certificates (corporate proxies);
/// `timeout` bounds each whole request.
pub fn build_client(verify_ssl: bool, timeout: Option<Duration>) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if !verify_ssl {
        builder = builder.danger_accept_invalid_certs(true);
    }
    if let Some(t) = timeout {
        builder = builder.timeout(t);
    }
    builder.build()
}
