//! HTTP gateway backends.
//!
//! Both services speak JSON over HTTP and accept an optional bearer token.
//! Request URLs are assembled segment by segment so that note ids and file
//! names are percent-encoded rather than interpreted as path structure.

mod record;
mod storage;

pub use record::HttpRecordGateway;
pub use storage::HttpStorageGateway;

use std::time::Duration;

use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;

use notesync_core::{Error, Result};

/// Build the shared HTTP client for a gateway.
fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Append `segments` to `base`, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| Error::Config(format!("Base URL cannot carry a path: {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn parse_base_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::Config(format!("Invalid base URL {}: {}", raw, e)))
}

/// Error body shape shared by both services.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "error")]
    message: String,
}

/// Map a non-success response to an error, consuming the body for its message.
async fn check_status(response: Response, op: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
    };

    Err(status_error(status, op, &message))
}

fn status_error(status: StatusCode, op: &str, message: &str) -> Error {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Unauthorized(format!("{} returned {}: {}", op, status, message))
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            Error::Request(format!("{} timed out upstream ({}): {}", op, status, message))
        }
        _ => Error::Request(format!("{} returned {}: {}", op, status, message)),
    }
}
