mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use crate::error::UpstreamError;
use tracing::debug;

/// Sends `req` and returns the response body as text.
///
/// # Errors
///
/// Network failures map to [`UpstreamError::Timeout`] or
/// [`UpstreamError::Unreachable`]; non-2xx statuses to [`UpstreamError::Status`].
pub async fn send_text<C: HttpClient + ?Sized>(
    client: &C,
    req: reqwest::Request,
) -> Result<String, UpstreamError> {
    let url = req.url().clone();
    let resp = client.execute(req).await?;
    let status = resp.status();

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let text = resp.text().await?;
    debug!(url = %url, bytes = text.len(), "Upstream response received");
    Ok(text)
}

/// Parses `url` for use in a [`reqwest::Request`].
pub fn parse_url(url: &str) -> Result<reqwest::Url, UpstreamError> {
    reqwest::Url::parse(url)
        .map_err(|e| UpstreamError::Unreachable(format!("invalid url {url}: {e}")))
}
