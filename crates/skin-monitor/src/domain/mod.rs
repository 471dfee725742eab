//! Domain layer for skin-monitor.
//!
//! The protocol and detection types live in `skin-monitor-core`; this layer
//! only adds the runtime configuration shared by the application services.

pub mod config;

pub use config::{DiscoveryConfig, MonitorConfig};
