//! Infrastructure layer for skin-monitor.
//!
//! Implements the application seams on real crates.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `skin_monitor_core`, but MUST NOT be imported by the `application` or
//! domain layers outside of tests.
//!
//! # Sub-modules
//!
//! - **`http_probe`** – `PortProbe` over `reqwest` with a per-request timeout.
//! - **`port_cache`** – `PortCache` backed by a TOML file in the platform
//!   config directory, plus an in-memory cache.
//! - **`ws_connector`** – `Connector` over `tokio-tungstenite`; a reader and a
//!   writer task per socket.
//! - **`document`** – `DocumentSource` implementations: HTML snapshot files
//!   parsed with `scraper` and watched with `notify`, and an in-memory table.

pub mod document;
pub mod http_probe;
pub mod port_cache;
pub mod ws_connector;

pub use document::{HtmlDocument, HtmlFileSource, MemoryDocumentSource};
pub use http_probe::HttpPortProbe;
pub use port_cache::{MemoryPortCache, TomlPortCache};
pub use ws_connector::WsConnector;
