//! Rose skin monitor: entry point.
//!
//! Watches an HTML dump of the game client UI for the hovered skin name and
//! relays every change to the Rose bridge over a local WebSocket.
//!
//! # Usage
//!
//! ```text
//! skin-monitor --document <PATH> [OPTIONS]
//!
//! Options:
//!   --document <PATH>             HTML dump of the client UI
//!   --shadow-root <PATH>          HTML dump of a shadow root (repeatable)
//!   --cache-file <PATH>           Port cache file [default: platform config dir]
//!   --bridge-host <HOST>          Bridge host [default: localhost]
//!   --default-port <PORT>         Port used when discovery fails [default: 50000]
//!   --scan-start <PORT>           First discovery port [default: 50000]
//!   --scan-end <PORT>             Last discovery port [default: 50010]
//!   --poll-interval-ms <MS>       Document poll period [default: 250]
//!   --reconnect-delay-ms <MS>     Bridge reconnect delay [default: 1000]
//!   --probe-timeout-ms <MS>       Discovery probe timeout [default: 1000]
//! ```
//!
//! # Environment variable overrides
//!
//! Every option can also be set with an environment variable.  CLI args take
//! precedence when both are present.
//!
//! | Variable                          | Default    |
//! |-----------------------------------|------------|
//! | `SKIN_MONITOR_DOCUMENT`           | (required) |
//! | `SKIN_MONITOR_SHADOW_ROOTS`       | none (comma-separated) |
//! | `SKIN_MONITOR_CACHE_FILE`         | platform   |
//! | `SKIN_MONITOR_BRIDGE_HOST`        | `localhost`|
//! | `SKIN_MONITOR_DEFAULT_PORT`       | `50000`    |
//! | `SKIN_MONITOR_SCAN_START`         | `50000`    |
//! | `SKIN_MONITOR_SCAN_END`           | `50010`    |
//! | `SKIN_MONITOR_POLL_INTERVAL_MS`   | `250`      |
//! | `SKIN_MONITOR_RECONNECT_DELAY_MS` | `1000`     |
//! | `SKIN_MONITOR_PROBE_TIMEOUT_MS`   | `1000`     |
//!
//! Log verbosity is controlled with `RUST_LOG` (default `info`).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use skin_monitor::application::{PortCache, SkinMonitor};
use skin_monitor::domain::{DiscoveryConfig, MonitorConfig};
use skin_monitor::infrastructure::{HtmlFileSource, HttpPortProbe, TomlPortCache, WsConnector};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Rose skin monitor.
///
/// Reports the hovered skin in the game client UI to the Rose bridge.
#[derive(Debug, Parser)]
#[command(
    name = "skin-monitor",
    about = "Relays the hovered skin name from the game client UI to the Rose bridge",
    version
)]
struct Cli {
    /// HTML dump of the client UI.  The monitor waits until it exists.
    #[arg(long, env = "SKIN_MONITOR_DOCUMENT")]
    document: PathBuf,

    /// HTML dump of a shadow root; changes to it trigger a re-read.
    #[arg(long = "shadow-root", env = "SKIN_MONITOR_SHADOW_ROOTS", value_delimiter = ',')]
    shadow_roots: Vec<PathBuf>,

    /// Port cache file.  Defaults to `cache.toml` in the platform config directory.
    #[arg(long, env = "SKIN_MONITOR_CACHE_FILE")]
    cache_file: Option<PathBuf>,

    /// Host of the bridge and its discovery endpoint.
    #[arg(long, default_value = "localhost", env = "SKIN_MONITOR_BRIDGE_HOST")]
    bridge_host: String,

    /// Port used when no discovery probe answers.
    #[arg(long, default_value_t = 50000, env = "SKIN_MONITOR_DEFAULT_PORT")]
    default_port: u16,

    /// First port of the discovery scan.
    #[arg(long, default_value_t = 50000, env = "SKIN_MONITOR_SCAN_START")]
    scan_start: u16,

    /// Last port of the discovery scan (inclusive).
    #[arg(long, default_value_t = 50010, env = "SKIN_MONITOR_SCAN_END")]
    scan_end: u16,

    /// Period of the document poll in milliseconds.
    #[arg(long, default_value_t = 250, env = "SKIN_MONITOR_POLL_INTERVAL_MS")]
    poll_interval_ms: u64,

    /// Delay before each bridge reconnect attempt in milliseconds.
    #[arg(long, default_value_t = 1000, env = "SKIN_MONITOR_RECONNECT_DELAY_MS")]
    reconnect_delay_ms: u64,

    /// Timeout of each discovery probe in milliseconds.
    #[arg(long, default_value_t = 1000, env = "SKIN_MONITOR_PROBE_TIMEOUT_MS")]
    probe_timeout_ms: u64,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`MonitorConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the scan range is empty or any period is zero.
    fn monitor_config(&self) -> anyhow::Result<MonitorConfig> {
        if self.scan_start > self.scan_end {
            anyhow::bail!(
                "invalid discovery range: --scan-start {} is after --scan-end {}",
                self.scan_start,
                self.scan_end
            );
        }
        for (flag, value) in [
            ("--poll-interval-ms", self.poll_interval_ms),
            ("--reconnect-delay-ms", self.reconnect_delay_ms),
            ("--probe-timeout-ms", self.probe_timeout_ms),
        ] {
            if value == 0 {
                anyhow::bail!("{flag} must be greater than zero");
            }
        }

        let defaults = MonitorConfig::default();
        Ok(MonitorConfig {
            discovery: DiscoveryConfig {
                host: self.bridge_host.clone(),
                start_port: self.scan_start,
                end_port: self.scan_end,
                default_port: self.default_port,
                probe_timeout: Duration::from_millis(self.probe_timeout_ms),
                ..defaults.discovery.clone()
            },
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            ..defaults
        })
    }

    fn port_cache(&self) -> anyhow::Result<TomlPortCache> {
        match &self.cache_file {
            Some(path) => Ok(TomlPortCache::new(path)),
            None => TomlPortCache::at_default_location().context("no --cache-file given"),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.monitor_config()?;
    let cache: Arc<dyn PortCache> = Arc::new(cli.port_cache()?);
    let probe = HttpPortProbe::new(config.discovery.probe_timeout)
        .context("failed to initialise the discovery HTTP client")?;

    info!(
        "skin monitor starting: document={}, discovery={}:{}..={}",
        cli.document.display(),
        config.discovery.host,
        config.discovery.start_port,
        config.discovery.end_port
    );

    let source = HtmlFileSource::new(cli.document.clone(), cli.shadow_roots.clone());
    let monitor = SkinMonitor::new(
        config,
        Arc::new(source),
        Arc::new(probe),
        cache,
        Arc::new(WsConnector),
    );
    let handle = monitor.start();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("received Ctrl+C, shutting down");

    handle.stop().await;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
