//! Application layer for skin-monitor.
//!
//! The application layer knows *what* the monitor does and defines the seams
//! it needs; the infrastructure layer supplies the implementations.
//!
//! # Responsibilities
//!
//! - Locating the bridge port (`resolve_port`)
//! - Queueing and delivering frames over a reconnecting socket (`bridge_client`)
//! - Turning inbound frames into published state and notifications (`dispatch`)
//! - Tying document sampling, detection and the bridge together (`monitor`)
//!
//! # What does NOT belong here?
//!
//! - HTTP requests, socket I/O, file access, HTML parsing (infrastructure)
//! - Wire message shapes and lookup rules (`skin-monitor-core`)

pub mod bridge_client;
pub mod dispatch;
pub mod monitor;
pub mod resolve_port;

pub use bridge_client::{
    spawn_bridge, BridgeError, BridgeHandle, BridgeSession, ConnectError, Connection, ConnectionState,
    Connector, FrameSink, SessionAction, SocketEvent,
};
pub use dispatch::{EventDispatcher, Notification, PublishedState, SKIN_STATE_EVENT, WHEEL_RESET_EVENT};
pub use monitor::{
    DocumentSource, MonitorHandle, ObserveError, ObserveTarget, ObserverGuard, SkinMonitor,
};
pub use resolve_port::{
    CacheError, PortCache, PortProbe, PortResolver, PortSource, ProbeError, Resolution,
};
