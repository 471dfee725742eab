//! Monitor configuration types.
//!
//! [`MonitorConfig`] is the single source of truth for all runtime settings.
//! `main.rs` fills it from CLI arguments and environment variables; tests
//! build it directly, usually from [`MonitorConfig::default`] with shorter
//! timings.

use std::time::Duration;

use skin_monitor_core::SKIN_SELECTORS;

/// First port of the discovery scan.
pub const DISCOVERY_START_PORT: u16 = 50000;
/// Last port of the discovery scan (inclusive).
pub const DISCOVERY_END_PORT: u16 = 50010;
/// Port used when discovery finds nothing.
pub const DEFAULT_BRIDGE_PORT: u16 = 50000;
/// Key of the cached bridge port in the persistent store.
pub const BRIDGE_PORT_STORAGE_KEY: &str = "rose_bridge_port";

/// How the bridge port is located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Host of both the discovery HTTP endpoint and the bridge socket.
    pub host: String,
    /// First port probed (inclusive).
    pub start_port: u16,
    /// Last port probed (inclusive).
    pub end_port: u16,
    /// Port used when every probe fails.
    pub default_port: u16,
    /// Per-probe timeout.
    pub probe_timeout: Duration,
    /// Key under which the last good port is cached.
    pub cache_key: String,
}

impl DiscoveryConfig {
    /// The ports probed during a scan, in order.
    pub fn scan_ports(&self) -> std::ops::RangeInclusive<u16> {
        self.start_port..=self.end_port
    }
}

impl Default for DiscoveryConfig {
    /// | Field          | Default              |
    /// |----------------|----------------------|
    /// | host           | `localhost`          |
    /// | start_port     | `50000`              |
    /// | end_port       | `50010`              |
    /// | default_port   | `50000`              |
    /// | probe_timeout  | 1 second             |
    /// | cache_key      | `rose_bridge_port`   |
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            start_port: DISCOVERY_START_PORT,
            end_port: DISCOVERY_END_PORT,
            default_port: DEFAULT_BRIDGE_PORT,
            probe_timeout: Duration::from_secs(1),
            cache_key: BRIDGE_PORT_STORAGE_KEY.to_string(),
        }
    }
}

/// All runtime configuration for the skin monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub discovery: DiscoveryConfig,

    /// Period of the timed re-read of the document.
    ///
    /// Catches text edits that do not change the tree and shadow roots
    /// attached after the observers were set up.
    pub poll_interval: Duration,

    /// How often to check whether the document body exists during startup.
    pub ready_poll_interval: Duration,

    /// Fixed delay before every reconnect attempt to the bridge socket.
    pub reconnect_delay: Duration,

    /// Skin-name selectors in priority order.
    pub selectors: Vec<String>,
}

impl Default for MonitorConfig {
    /// | Field                | Default                              |
    /// |----------------------|--------------------------------------|
    /// | discovery            | [`DiscoveryConfig::default`]         |
    /// | poll_interval        | 250 ms                               |
    /// | ready_poll_interval  | 250 ms                               |
    /// | reconnect_delay      | 1 second                             |
    /// | selectors            | `.skin-name-text`, `.skin-name`      |
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            poll_interval: Duration::from_millis(250),
            ready_poll_interval: Duration::from_millis(250),
            reconnect_delay: Duration::from_secs(1),
            selectors: SKIN_SELECTORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
