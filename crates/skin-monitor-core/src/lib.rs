//! # skin-monitor-core
//!
//! Shared library for the Rose skin monitor containing the bridge wire
//! protocol, the skin state types, and the pure change-detection logic.
//!
//! This crate has no dependencies on async runtimes, sockets, file systems, or
//! HTML parsers.  Everything here can be unit-tested without any setup.
//!
//! # What does the skin monitor do?
//!
//! The game client renders the name of the currently hovered skin somewhere in
//! its UI.  The monitor keeps reading that name out of the document, and every
//! time it changes it sends a small JSON frame to the Rose bridge (a local
//! WebSocket server).  The bridge answers with its own messages: skin state
//! updates, custom-wheel responses, and phase changes.
//!
//! - **`protocol`** – The JSON frames exchanged with the bridge.  Inbound
//!   frames are parsed into a closed [`InboundMessage`] enum.
//!
//! - **`domain`** – Pure business logic: the [`Document`] abstraction and the
//!   skin lookup rules, the [`ChangeDetector`] that reports transitions only,
//!   the published [`SkinState`], and [`BridgeEndpoint`] parsing.

pub mod domain;
pub mod protocol;

pub use domain::detector::ChangeDetector;
pub use domain::document::{read_current_skin, Document, ElementSnapshot, SKIN_SELECTORS};
pub use domain::endpoint::{parse_port_body, BridgeEndpoint, DiscoveryPath};
pub use domain::skin::{now_millis, SkinObservation, SkinState};
pub use protocol::messages::{
    parse_inbound, InboundMessage, PassThroughKind, ProtocolError, SkinHovered, SkinStatePayload,
};
