//! Reachability probe run before the browser navigates.
//!
//! Chromium happily "loads" its own error page when a server is down, so the
//! runner checks the target's host and port first and reports a missing
//! server as a navigation failure.

use crate::{Error, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Bound on the TCP connect attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Fail with [`Error::Navigation`] unless a TCP connection to the URL's
/// host and port can be opened within `timeout`.
///
/// Schemes without a network endpoint (`file:`, `data:`) always pass.
pub async fn ensure_reachable(raw_url: &str, timeout: Duration) -> Result<()> {
    let url = url::Url::parse(raw_url)
        .map_err(|e| Error::Navigation(format!("invalid url '{}': {}", raw_url, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Ok(());
    }

    let host = url
        .host_str()
        .ok_or_else(|| Error::Navigation(format!("url '{}' has no host", raw_url)))?;
    // Bracketed IPv6 literals must be unwrapped for the resolver.
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let port = url
        .port_or_known_default()
        .ok_or_else(|| Error::Navigation(format!("url '{}' has no port", raw_url)))?;

    debug!("preflight: connecting to {}:{}", host, port);
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(e)) => Err(Error::Navigation(format!(
            "server at {}:{} is unreachable: {}",
            host, port, e
        ))),
        Err(_) => Err(Error::Navigation(format!(
            "server at {}:{} did not accept a connection within {}ms",
            host,
            port,
            timeout.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_listening_server_passes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let url = format!("http://127.0.0.1:{}/blog/", port);
        ensure_reachable(&url, CONNECT_TIMEOUT).await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_port_is_navigation_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let url = format!("http://127.0.0.1:{}/", port);
        let err = ensure_reachable(&url, CONNECT_TIMEOUT).await.unwrap_err();
        assert!(matches!(err, Error::Navigation(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_non_network_schemes_skip_probe() {
        ensure_reachable("data:text/html,<p>hi</p>", CONNECT_TIMEOUT)
            .await
            .unwrap();
        ensure_reachable("file:///tmp/page.html", CONNECT_TIMEOUT)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_garbage_url_is_navigation_error() {
        let err = ensure_reachable("not a url", CONNECT_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Navigation(_)));
    }
}
