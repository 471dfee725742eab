//! skin-monitor library crate.
//!
//! Watches the game client's rendered UI for the hovered skin name, relays
//! every change to the Rose bridge over a local WebSocket, and turns the
//! bridge's replies into local notifications.
//!
//! # Architecture
//!
//! ```text
//! Document (HTML snapshot / in-memory)          Rose bridge (ws://localhost:500xx)
//!         │  structural changes + 250 ms poll              ↑ JSON frames ↓
//! [skin-monitor]
//!   ├── domain/           MonitorConfig
//!   ├── application/
//!   │     ├── resolve_port/   cached port → scan /bridge-port → scan /port → default
//!   │     ├── bridge_client/  queue + reconnect state machine and its driver task
//!   │     ├── dispatch/       inbound frames → published state / notifications / reset
//!   │     └── monitor/        the session object tying everything together
//!   └── infrastructure/
//!         ├── http_probe/     reqwest discovery probe
//!         ├── port_cache/     TOML key-value cache file
//!         ├── ws_connector/   tokio-tungstenite bridge socket
//!         └── document/       scraper + notify HTML file source, in-memory source
//! ```
//!
//! # Layer rules
//!
//! - `domain` holds plain configuration with no I/O.
//! - `application` owns the behaviour and defines the traits it needs
//!   (`PortProbe`, `PortCache`, `Connector`, `DocumentSource`).
//! - `infrastructure` implements those traits on real crates.

/// Domain layer: runtime configuration.
pub mod domain;

/// Application layer: resolver, bridge client, dispatcher, monitor.
pub mod application;

/// Infrastructure layer: HTTP, WebSocket, file cache, and document adapters.
pub mod infrastructure;
