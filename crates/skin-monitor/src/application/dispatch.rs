//! Inbound bridge frame dispatch.
//!
//! Every text frame from the bridge is parsed into an [`InboundMessage`] and
//! turned into local effects:
//!
//! | Frame                        | Effect                                                    |
//! |------------------------------|-----------------------------------------------------------|
//! | `skin-state`                 | replace the published [`SkinState`], notify               |
//! | custom-wheel responses       | re-broadcast the record under its event name              |
//! | `phase-change` to `Lobby`    | re-arm the change detector, notify `rose-custom-wheel-reset` |
//! | anything else, invalid JSON  | logged verbatim                                           |

use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tracing::info;

use skin_monitor_core::{
    now_millis, parse_inbound, ChangeDetector, InboundMessage, PassThroughKind, SkinState,
};

/// Event name of skin state notifications.
pub const SKIN_STATE_EVENT: &str = "lu-skin-monitor-state";
/// Event name of the lobby reset notification.
pub const WHEEL_RESET_EVENT: &str = "rose-custom-wheel-reset";

/// A local notification produced by an inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// The published skin state was replaced.
    SkinState(SkinState),
    /// A custom-wheel record, passed through unchanged.
    PassThrough { kind: PassThroughKind, detail: Value },
    /// The game returned to the lobby.
    WheelReset,
}

impl Notification {
    /// The name listeners subscribe to.
    pub fn event_name(&self) -> &'static str {
        match self {
            Notification::SkinState(_) => SKIN_STATE_EVENT,
            Notification::PassThrough { kind, .. } => kind.event_name(),
            Notification::WheelReset => WHEEL_RESET_EVENT,
        }
    }
}

/// Read access to the most recent published skin state.
#[derive(Debug, Clone)]
pub struct PublishedState {
    rx: watch::Receiver<Option<SkinState>>,
}

impl PublishedState {
    pub fn new(rx: watch::Receiver<Option<SkinState>>) -> Self {
        Self { rx }
    }

    /// The whole state, if the bridge has sent one.
    pub fn current(&self) -> Option<SkinState> {
        self.rx.borrow().clone()
    }

    /// Just the skin name of the current state.
    pub fn current_skin(&self) -> Option<String> {
        self.rx.borrow().as_ref().and_then(|state| state.name.clone())
    }

    /// A receiver for awaiting state changes.
    pub fn watch(&self) -> watch::Receiver<Option<SkinState>> {
        self.rx.clone()
    }
}

/// Applies inbound frames to the published state and the detector.
pub struct EventDispatcher {
    state: watch::Sender<Option<SkinState>>,
    notifications: broadcast::Sender<Notification>,
}

impl EventDispatcher {
    pub fn new(
        state: watch::Sender<Option<SkinState>>,
        notifications: broadcast::Sender<Notification>,
    ) -> Self {
        Self {
            state,
            notifications,
        }
    }

    /// Handles one inbound text frame.
    pub fn dispatch(&self, frame: &str, detector: &mut ChangeDetector) {
        let message = match parse_inbound(frame) {
            Ok(message) => message,
            Err(_) => {
                info!("bridge message: {frame}");
                return;
            }
        };

        if message.is_lobby_entered() {
            detector.reset();
            info!("reset skin state for new game (Lobby phase)");
            self.notify(Notification::WheelReset);
            return;
        }

        match message {
            InboundMessage::SkinState(payload) => {
                let state = SkinState::from_payload(&payload, now_millis());
                self.state.send_replace(Some(state.clone()));
                self.notify(Notification::SkinState(state));
            }
            InboundMessage::PassThrough { kind, record } => {
                self.notify(Notification::PassThrough {
                    kind,
                    detail: record,
                });
            }
            InboundMessage::PhaseChange { .. } | InboundMessage::Unknown { .. } => {
                info!("bridge message: {frame}");
            }
        }
    }

    fn notify(&self, notification: Notification) {
        // No subscribers is fine.
        let _ = self.notifications.send(notification);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
