//! Registry implementations for fetching release and popularity data

use std::time::Duration;

use reqwest::{Response, StatusCode};
use tracing::warn;

use crate::config::FETCH_TIMEOUT_MS;
use crate::source::error::SourceError;

pub mod github;
pub mod npm;
pub mod pypi;

pub use github::GitHubSource;
pub use npm::NpmSource;
pub use pypi::PypiSource;

const USER_AGENT: &str = concat!("stack-tracker/", env!("CARGO_PKG_VERSION"));

/// Per-call timeout used by the default sources
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(FETCH_TIMEOUT_MS);

/// Build the shared HTTP client with the per-call timeout applied
fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client")
}

/// Map non-success statuses onto `SourceError`
fn check_status(response: Response, package_id: &str) -> Result<Response, SourceError> {
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound(package_id.to_string()));
    }

    let rate_limit_exhausted = status == StatusCode::FORBIDDEN
        && response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0");

    if status == StatusCode::TOO_MANY_REQUESTS || rate_limit_exhausted {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return Err(SourceError::RateLimited {
            retry_after_secs: retry_after,
        });
    }

    if !status.is_success() {
        warn!("Registry returned status {}: {}", status, response.url());
        return Err(SourceError::InvalidResponse(format!(
            "Unexpected status: {}",
            status
        )));
    }

    Ok(response)
}
