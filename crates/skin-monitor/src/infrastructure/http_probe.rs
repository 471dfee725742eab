//! HTTP discovery probe.
//!
//! `GET http://{host}:{port}/bridge-port` (or the legacy `/port`) must answer
//! 2xx with the bridge port as plain text.  Each request is bounded by the
//! configured probe timeout so a silent port costs at most that long.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use skin_monitor_core::{parse_port_body, DiscoveryPath};

use crate::application::resolve_port::{PortProbe, ProbeError};

/// A [`PortProbe`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpPortProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpPortProbe {
    /// Creates a probe whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialised (e.g. the
    /// TLS backend fails to load).
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        // Discovery only ever targets the local machine.
        let client = reqwest::Client::builder().no_proxy().build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl PortProbe for HttpPortProbe {
    async fn probe(&self, host: &str, port: u16, path: DiscoveryPath) -> Result<u16, ProbeError> {
        let url = format!("http://{host}:{port}{}", path.path());
        debug!("probing {url}");

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProbeError::Request {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| ProbeError::Request {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        parse_port_body(&body).ok_or(ProbeError::InvalidBody { url, body })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn server_answering(route: &str, template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    fn probe() -> HttpPortProbe {
        HttpPortProbe::new(Duration::from_millis(500)).unwrap()
    }

    #[tokio::test]
    async fn test_probe_parses_plain_text_port() {
        // Arrange
        let server =
            server_answering("/bridge-port", ResponseTemplate::new(200).set_body_string("50003\n")).await;
        let port = server.address().port();

        // Act
        let result = probe().probe("127.0.0.1", port, DiscoveryPath::BridgePort).await;

        // Assert
        assert_eq!(result.unwrap(), 50003);
    }

    #[tokio::test]
    async fn test_probe_uses_legacy_path() {
        let server = server_answering("/port", ResponseTemplate::new(200).set_body_string("50001")).await;
        let port = server.address().port();

        assert_eq!(probe().probe("127.0.0.1", port, DiscoveryPath::Legacy).await.unwrap(), 50001);
        assert!(matches!(
            probe().probe("127.0.0.1", port, DiscoveryPath::BridgePort).await,
            Err(ProbeError::Status { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_non_success_status_is_rejected() {
        let server =
            server_answering("/bridge-port", ResponseTemplate::new(503).set_body_string("50003")).await;

        let result = probe()
            .probe("127.0.0.1", server.address().port(), DiscoveryPath::BridgePort)
            .await;

        assert!(matches!(result, Err(ProbeError::Status { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_unparseable_body_is_rejected() {
        let server =
            server_answering("/bridge-port", ResponseTemplate::new(200).set_body_string("ready")).await;

        let result = probe()
            .probe("127.0.0.1", server.address().port(), DiscoveryPath::BridgePort)
            .await;

        assert!(matches!(result, Err(ProbeError::InvalidBody { body, .. }) if body == "ready"));
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = server_answering(
            "/bridge-port",
            ResponseTemplate::new(200)
                .set_body_string("50000")
                .set_delay(Duration::from_secs(3)),
        )
        .await;

        let started = std::time::Instant::now();
        let result = probe()
            .probe("127.0.0.1", server.address().port(), DiscoveryPath::BridgePort)
            .await;

        assert!(matches!(result, Err(ProbeError::Request { .. })));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_closed_port_is_a_request_error() {
        // Bind then drop a listener to find a port nothing listens on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let result = probe().probe("127.0.0.1", port, DiscoveryPath::BridgePort).await;

        assert!(matches!(result, Err(ProbeError::Request { .. })));
    }
}
