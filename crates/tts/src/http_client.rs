use std::time::Duration;

use http::{HeaderMap, HeaderValue, header};
use reqwest::Client;

use crate::error::{Result, TtsError};

/// HTTP client shared by every request a synthesizer makes
///
/// `timeout` bounds each vendor call; a slow vendor surfaces as a
/// provider error rather than blocking forever.
pub fn http_client(timeout: Duration) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

    Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Some(Duration::from_secs(5)))
        .tcp_nodelay(true)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .default_headers(headers)
        .build()
        .map_err(|e| TtsError::Configuration(format!("failed to build HTTP client: {e}")))
}
