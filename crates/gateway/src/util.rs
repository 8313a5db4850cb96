//! HTTP helpers shared by the outbound clients.

use sr_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Pass 2xx responses through; turn anything else into an error built by
/// `wrap` from the status line and body.
pub(crate) async fn expect_success(
    resp: reqwest::Response,
    wrap: fn(String) -> Error,
) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(wrap(format!("HTTP {} - {}", status.as_u16(), body)))
}
