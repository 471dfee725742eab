//! Bridge endpoint and port discovery parsing.
//!
//! The bridge listens on a port that is not fixed.  A small HTTP server next
//! to it answers `GET /bridge-port` (older bridges: `GET /port`) with the port
//! number as plain text.  These helpers turn that answer into a
//! [`BridgeEndpoint`].

use std::fmt;

/// Where the bridge WebSocket server can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeEndpoint {
    pub host: String,
    pub port: u16,
}

impl BridgeEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// The WebSocket URL, e.g. `ws://localhost:50000`.
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for BridgeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The HTTP path a discovery probe asks for the bridge port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoveryPath {
    /// `/bridge-port`, served by current bridges.
    BridgePort,
    /// `/port`, served by older bridges.
    Legacy,
}

impl DiscoveryPath {
    pub fn path(self) -> &'static str {
        match self {
            DiscoveryPath::BridgePort => "/bridge-port",
            DiscoveryPath::Legacy => "/port",
        }
    }
}

/// Parses a discovery response body (or a cached value) into a port.
///
/// Leading and trailing whitespace is ignored, then an optional sign and the
/// leading decimal digits are read; anything after the digits is ignored.
/// The result must be a valid, non-zero TCP port.
///
/// ```rust
/// use skin_monitor_core::parse_port_body;
///
/// assert_eq!(parse_port_body("50003\n"), Some(50003));
/// assert_eq!(parse_port_body("50003 ok"), Some(50003));
/// assert_eq!(parse_port_body("0"), None);
/// assert_eq!(parse_port_body("port"), None);
/// ```
pub fn parse_port_body(body: &str) -> Option<u16> {
    let trimmed = body.trim();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 || negative {
        return None;
    }

    // More than five significant digits can never be a port.
    let digits = rest[..digits_len].trim_start_matches('0');
    if digits.len() > 5 {
        return None;
    }
    let value: u32 = if digits.is_empty() { 0 } else { digits.parse().ok()? };

    u16::try_from(value).ok().filter(|port| *port > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_uses_ws_scheme() {
        let ep = BridgeEndpoint::new("localhost", 50003);
        assert_eq!(ep.url(), "ws://localhost:50003");
    }

    #[test]
    fn test_endpoint_display_is_host_and_port() {
        let ep = BridgeEndpoint::new("127.0.0.1", 50000);
        assert_eq!(ep.to_string(), "127.0.0.1:50000");
    }

    #[test]
    fn test_discovery_paths() {
        assert_eq!(DiscoveryPath::BridgePort.path(), "/bridge-port");
        assert_eq!(DiscoveryPath::Legacy.path(), "/port");
    }

    #[test]
    fn test_parse_plain_number() {
        assert_eq!(parse_port_body("50000"), Some(50000));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(parse_port_body("  50007\r\n"), Some(50007));
    }

    #[test]
    fn test_parse_ignores_trailing_garbage() {
        assert_eq!(parse_port_body("50001abc"), Some(50001));
        assert_eq!(parse_port_body("50001.9"), Some(50001));
    }

    #[test]
    fn test_parse_accepts_plus_sign_and_leading_zeros() {
        assert_eq!(parse_port_body("+50002"), Some(50002));
        assert_eq!(parse_port_body("00050002"), Some(50002));
    }

    #[test]
    fn test_parse_rejects_zero_and_negative() {
        assert_eq!(parse_port_body("0"), None);
        assert_eq!(parse_port_body("-50000"), None);
        assert_eq!(parse_port_body("-0"), None);
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert_eq!(parse_port_body("65536"), None);
        assert_eq!(parse_port_body("99999999999999999999"), None);
        assert_eq!(parse_port_body("65535"), Some(65535));
    }

    #[test]
    fn test_parse_rejects_non_numeric_and_empty() {
        assert_eq!(parse_port_body(""), None);
        assert_eq!(parse_port_body("   "), None);
        assert_eq!(parse_port_body("port: 50000"), None);
        assert_eq!(parse_port_body("+"), None);
    }
}
