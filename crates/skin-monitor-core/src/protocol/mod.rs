//! Bridge wire protocol: JSON text frames, one message per WebSocket frame.

pub mod messages;

pub use messages::*;
