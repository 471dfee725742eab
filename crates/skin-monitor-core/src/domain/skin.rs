//! Skin observation and published skin state.

use serde::Serialize;

use crate::protocol::messages::{SkinHovered, SkinStatePayload};

/// Returns the current time as milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A skin name the detector has just reported.
///
/// Only the most recent observation is ever kept; it is overwritten on every
/// transition and cleared when the bridge signals a new lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkinObservation {
    pub name: String,
    /// Capture time in milliseconds since the Unix epoch.
    pub detected_at: u64,
}

impl SkinObservation {
    /// Creates an observation stamped with the current time.
    pub fn now(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detected_at: now_millis(),
        }
    }

    /// The outbound bridge message announcing this observation.
    pub fn to_message(&self) -> SkinHovered {
        SkinHovered {
            skin: self.name.clone(),
            timestamp: self.detected_at,
        }
    }
}

/// The bridge's latest view of the selected skin.
///
/// Every `skin-state` frame produces a brand-new value; fields are never
/// merged with the previous state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkinState {
    pub name: Option<String>,
    pub skin_id: Option<i64>,
    pub champion_id: Option<i64>,
    pub has_chromas: bool,
    /// Time the state was published, milliseconds since the Unix epoch.
    pub updated_at: u64,
}

impl SkinState {
    /// Builds the published state from a `skin-state` payload.
    pub fn from_payload(payload: &SkinStatePayload, updated_at: u64) -> Self {
        Self {
            name: payload.skin_name.clone(),
            skin_id: payload.skin_id,
            champion_id: payload.champion_id,
            has_chromas: payload.has_chromas,
            updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_observation_message_carries_name_and_capture_time() {
        let obs = SkinObservation {
            name: "Spirit Blossom Ahri".to_string(),
            detected_at: 42,
        };
        let msg = obs.to_message();
        assert_eq!(msg.skin, "Spirit Blossom Ahri");
        assert_eq!(msg.timestamp, 42);
    }

    #[test]
    fn test_state_from_payload_copies_every_field() {
        // Arrange
        let payload = SkinStatePayload {
            skin_name: Some("K/DA Ahri".to_string()),
            skin_id: Some(103015),
            champion_id: Some(103),
            has_chromas: true,
        };

        // Act
        let state = SkinState::from_payload(&payload, 7);

        // Assert
        assert_eq!(state.name.as_deref(), Some("K/DA Ahri"));
        assert_eq!(state.skin_id, Some(103015));
        assert_eq!(state.champion_id, Some(103));
        assert!(state.has_chromas);
        assert_eq!(state.updated_at, 7);
    }

    #[test]
    fn test_state_serializes_with_camel_case_keys() {
        let state = SkinState {
            name: None,
            skin_id: None,
            champion_id: Some(1),
            has_chromas: false,
            updated_at: 9,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": null,
                "skinId": null,
                "championId": 1,
                "hasChromas": false,
                "updatedAt": 9
            })
        );
    }
}
