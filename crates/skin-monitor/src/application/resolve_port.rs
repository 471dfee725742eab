//! Bridge port resolution.
//!
//! The bridge picks its port at startup, so the monitor has to find it:
//!
//! ```text
//! cached port ──probe /bridge-port──▶ ok? ─────────────────────────▶ use it
//!      │ missing / stale (cache entry removed)
//!      ▼
//! 50000..=50010 ──probe /bridge-port──▶ first ok ──▶ cache ─────────▶ use it
//!      │ nothing answered
//!      ▼
//! 50000..=50010 ──probe /port (legacy)─▶ first ok ──▶ cache ─────────▶ use it
//!      │ nothing answered
//!      ▼
//! default port (not cached, warning logged)
//! ```
//!
//! Probes run one after another.  Every failure mode (refused connection,
//! timeout, non-2xx status, unparseable body) just moves on to the next
//! candidate, so [`PortResolver::resolve`] always returns an endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use skin_monitor_core::{parse_port_body, BridgeEndpoint, DiscoveryPath};

use crate::domain::config::DiscoveryConfig;

// ── Seams ─────────────────────────────────────────────────────────────────────

/// Why a single discovery probe failed.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The request could not be completed (refused, reset, timed out).
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    /// The body was not a positive port number.
    #[error("{url} answered with an unusable body: {body:?}")]
    InvalidBody { url: String, body: String },
}

/// Asks one candidate port for the bridge port.
#[async_trait]
pub trait PortProbe: Send + Sync {
    /// Issues `GET http://{host}:{port}{path}` and parses the answer.
    async fn probe(&self, host: &str, port: u16, path: DiscoveryPath) -> Result<u16, ProbeError>;
}

/// Errors from the persistent port cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store could not be read or written.
    #[error("port cache unavailable: {0}")]
    Unavailable(String),
}

/// A persistent string key-value store holding the last good port.
pub trait PortCache: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn store(&self, key: &str, value: &str) -> Result<(), CacheError>;
    fn remove(&self, key: &str) -> Result<(), CacheError>;
}

// ── Resolver ──────────────────────────────────────────────────────────────────

/// Where a resolved port came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSource {
    /// The cached port answered its verification probe.
    Cache,
    /// Found by scanning `/bridge-port`.
    Discovered,
    /// Found by scanning the legacy `/port` endpoint.
    Legacy,
    /// Nothing answered; the configured default is used.
    Default,
}

/// The outcome of [`PortResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub endpoint: BridgeEndpoint,
    pub source: PortSource,
}

/// Locates the bridge port using a probe and a persistent cache.
pub struct PortResolver {
    config: DiscoveryConfig,
    probe: Arc<dyn PortProbe>,
    cache: Arc<dyn PortCache>,
}

impl PortResolver {
    pub fn new(config: DiscoveryConfig, probe: Arc<dyn PortProbe>, cache: Arc<dyn PortCache>) -> Self {
        Self {
            config,
            probe,
            cache,
        }
    }

    /// Resolves the bridge endpoint.  Never fails.
    pub async fn resolve(&self) -> Resolution {
        if let Some(port) = self.verify_cached().await {
            info!("loaded bridge port from cache: {port}");
            return self.resolution(port, PortSource::Cache);
        }

        let scans = [
            (DiscoveryPath::BridgePort, PortSource::Discovered),
            (DiscoveryPath::Legacy, PortSource::Legacy),
        ];
        for (path, source) in scans {
            if let Some(port) = self.scan(path).await {
                self.remember(port);
                match source {
                    PortSource::Legacy => info!("loaded bridge port (legacy): {port}"),
                    _ => info!("loaded bridge port: {port}"),
                }
                return self.resolution(port, source);
            }
        }

        warn!(
            "failed to load bridge port, using default ({})",
            self.config.default_port
        );
        self.resolution(self.config.default_port, PortSource::Default)
    }

    /// Probes the cached port.  Any cached value that does not verify is removed.
    async fn verify_cached(&self) -> Option<u16> {
        let cached = match self.cache.load(&self.config.cache_key) {
            Ok(value) => value?,
            Err(e) => {
                warn!("could not read cached bridge port: {e}");
                self.forget();
                return None;
            }
        };

        let verified = match parse_port_body(&cached) {
            Some(port) => match self
                .probe
                .probe(&self.config.host, port, DiscoveryPath::BridgePort)
                .await
            {
                Ok(bridge_port) => Some(bridge_port),
                Err(e) => {
                    debug!("cached bridge port {port} failed verification: {e}");
                    None
                }
            },
            None => {
                debug!("cached bridge port {cached:?} is not a port number");
                None
            }
        };

        if verified.is_none() {
            self.forget();
        }
        verified
    }

    fn forget(&self) {
        if let Err(e) = self.cache.remove(&self.config.cache_key) {
            warn!("could not clear stale bridge port cache: {e}");
        }
    }

    /// Probes every port of the discovery range on `path`; first success wins.
    async fn scan(&self, path: DiscoveryPath) -> Option<u16> {
        for port in self.config.scan_ports() {
            match self.probe.probe(&self.config.host, port, path).await {
                Ok(bridge_port) => return Some(bridge_port),
                Err(e) => debug!("discovery probe failed: {e}"),
            }
        }
        None
    }

    fn remember(&self, port: u16) {
        if let Err(e) = self.cache.store(&self.config.cache_key, &port.to_string()) {
            warn!("could not cache bridge port {port}: {e}");
        }
    }

    fn resolution(&self, port: u16, source: PortSource) -> Resolution {
        Resolution {
            endpoint: BridgeEndpoint::new(self.config.host.clone(), port),
            source,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
