//! JSON message types for the Rose bridge socket.
//!
//! # Message flow
//!
//! ```text
//! Monitor → Bridge:  SkinHovered          →  {"skin":"Ahri","timestamp":1700000000000}
//! Bridge  → Monitor: JSON text frame      →  InboundMessage
//! ```
//!
//! # JSON discriminant
//!
//! Inbound frames are JSON objects carrying a `"type"` field.  Only a handful
//! of tags are understood; everything else is kept as [`InboundMessage::Unknown`]
//! so the caller can log it verbatim.
//!
//! Parsing is lenient: apart from the `type` tag, only the few
//! fields read for `skin-state` and `phase-change` are inspected, and each of
//! them degrades to "absent" instead of failing the whole frame.
//!
//! The outbound direction has exactly one typed frame, [`SkinHovered`].
//! Arbitrary records can also be emitted as raw JSON by the application layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The `phase` value of a `phase-change` frame that resets skin detection.
pub const LOBBY_PHASE: &str = "Lobby";

/// Errors raised while encoding or decoding bridge frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame is not valid JSON.
    #[error("malformed bridge frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

// ── Monitor → Bridge ──────────────────────────────────────────────────────────

/// Sent every time the detected skin name changes.
///
/// ```json
/// {"skin":"Star Guardian Ahri","timestamp":1700000000000}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkinHovered {
    /// Trimmed skin name as rendered in the client UI.
    pub skin: String,
    /// Capture time in milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl SkinHovered {
    /// Serializes the message into a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Malformed`] if serialization fails.
    pub fn to_frame(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

// ── Bridge → Monitor ──────────────────────────────────────────────────────────

/// Custom-wheel response categories that are re-broadcast untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassThroughKind {
    SkinMods,
    Maps,
    Fonts,
    Announcers,
    Others,
    ChampionLocked,
}

impl PassThroughKind {
    /// Every pass-through kind, in dispatch order.
    pub const ALL: [PassThroughKind; 6] = [
        PassThroughKind::SkinMods,
        PassThroughKind::Maps,
        PassThroughKind::Fonts,
        PassThroughKind::Announcers,
        PassThroughKind::Others,
        PassThroughKind::ChampionLocked,
    ];

    /// Maps a wire `type` tag to its pass-through kind.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// The `type` tag used on the wire.
    pub fn tag(self) -> &'static str {
        match self {
            PassThroughKind::SkinMods => "skin-mods-response",
            PassThroughKind::Maps => "maps-response",
            PassThroughKind::Fonts => "fonts-response",
            PassThroughKind::Announcers => "announcers-response",
            PassThroughKind::Others => "others-response",
            PassThroughKind::ChampionLocked => "champion-locked",
        }
    }

    /// Name of the local notification the record is re-broadcast under.
    pub fn event_name(self) -> &'static str {
        match self {
            PassThroughKind::SkinMods => "rose-custom-wheel-skin-mods",
            PassThroughKind::Maps => "rose-custom-wheel-maps",
            PassThroughKind::Fonts => "rose-custom-wheel-fonts",
            PassThroughKind::Announcers => "rose-custom-wheel-announcers",
            PassThroughKind::Others => "rose-custom-wheel-others",
            PassThroughKind::ChampionLocked => "rose-custom-wheel-champion-locked",
        }
    }
}

/// The fields of a `skin-state` frame that the monitor reads.
///
/// ```json
/// {"type":"skin-state","skinName":"Arcade Ahri","skinId":103004,"championId":103,"hasChromas":true}
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkinStatePayload {
    /// `skinName`; an empty or non-string value is treated as absent.
    pub skin_name: Option<String>,
    /// `skinId`; only integral JSON numbers are accepted.
    pub skin_id: Option<i64>,
    /// `championId`; only integral JSON numbers are accepted.
    pub champion_id: Option<i64>,
    /// `hasChromas`, coerced with JSON truthiness.
    pub has_chromas: bool,
}

impl SkinStatePayload {
    /// Extracts the payload from a decoded `skin-state` record.
    pub fn from_record(record: &Value) -> Self {
        Self {
            skin_name: record
                .get("skinName")
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .map(str::to_owned),
            skin_id: record.get("skinId").and_then(integral),
            champion_id: record.get("championId").and_then(integral),
            has_chromas: record.get("hasChromas").is_some_and(truthy),
        }
    }
}

/// A decoded inbound bridge frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// `skin-state`: the bridge's view of the selected skin.
    SkinState(SkinStatePayload),

    /// One of the custom-wheel responses, re-broadcast with the full record.
    PassThrough {
        kind: PassThroughKind,
        record: Value,
    },

    /// `phase-change`: the game flow moved to a new phase.
    PhaseChange {
        /// The `phase` field, if it was a string.
        phase: Option<String>,
    },

    /// Any record whose tag is missing or not understood.
    Unknown {
        /// The `type` field, if it was a string.
        tag: Option<String>,
    },
}

impl InboundMessage {
    /// Returns `true` for a `phase-change` into the lobby.
    pub fn is_lobby_entered(&self) -> bool {
        matches!(self, InboundMessage::PhaseChange { phase: Some(phase) } if phase == LOBBY_PHASE)
    }
}

/// Parses one inbound text frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] when the frame is not JSON at all.
/// Well-formed JSON never fails: unrecognised shapes become
/// [`InboundMessage::Unknown`].
///
/// # Example
///
/// ```rust
/// use skin_monitor_core::{parse_inbound, InboundMessage};
///
/// let msg = parse_inbound(r#"{"type":"phase-change","phase":"Lobby"}"#).unwrap();
/// assert!(msg.is_lobby_entered());
///
/// let msg = parse_inbound(r#"{"type":"something-new"}"#).unwrap();
/// assert!(matches!(msg, InboundMessage::Unknown { .. }));
/// ```
pub fn parse_inbound(frame: &str) -> Result<InboundMessage, ProtocolError> {
    let record: Value = serde_json::from_str(frame)?;

    let tag = record.get("type").and_then(Value::as_str);

    let message = match tag {
        Some("skin-state") => InboundMessage::SkinState(SkinStatePayload::from_record(&record)),
        Some("phase-change") => InboundMessage::PhaseChange {
            phase: record
                .get("phase")
                .and_then(Value::as_str)
                .map(str::to_owned),
        },
        Some(other) => match PassThroughKind::from_tag(other) {
            Some(kind) => InboundMessage::PassThrough { kind, record },
            None => InboundMessage::Unknown {
                tag: Some(other.to_owned()),
            },
        },
        None => InboundMessage::Unknown { tag: None },
    };

    Ok(message)
}

/// Accepts JSON numbers with no fractional part.
fn integral(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() <= i64::MAX as f64)
        .map(|f| f as i64)
}

/// JSON truthiness: `false`, `null`, `0`, `NaN`, and `""` are false.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
