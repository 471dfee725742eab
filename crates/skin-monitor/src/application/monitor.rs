//! The monitor session.
//!
//! [`SkinMonitor`] owns every moving part: it waits for the document, resolves
//! the bridge port, starts the bridge client, attaches structural-change
//! observers, and then samples the document on every notification and every
//! poll tick.  Inbound bridge frames go through the [`EventDispatcher`].
//!
//! ```text
//!  observers ──┐
//!  poll tick ──┼──▶ sample() ──▶ ChangeDetector ──▶ "hovered skin" ──▶ bridge
//!              │
//!  bridge ─────┴──▶ EventDispatcher ──▶ published state / notifications / reset
//! ```
//!
//! Everything above runs on one task, so the detector needs no lock.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use skin_monitor_core::{read_current_skin, ChangeDetector, Document, SkinObservation, SkinState};

use crate::application::bridge_client::{spawn_bridge, BridgeError, BridgeHandle, Connector};
use crate::application::dispatch::{EventDispatcher, Notification, PublishedState};
use crate::application::resolve_port::{PortCache, PortProbe, PortResolver};
use crate::domain::config::MonitorConfig;

/// Capacity of the notification broadcast channel.
const NOTIFICATION_CAPACITY: usize = 64;

// ── Document seam ─────────────────────────────────────────────────────────────

/// A part of the document that can be watched for structural changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserveTarget {
    /// The document body and its whole subtree.
    Body,
    /// A shadow root, identified by the source.
    ShadowRoot(String),
}

impl std::fmt::Display for ObserveTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObserveTarget::Body => write!(f, "document body"),
            ObserveTarget::ShadowRoot(id) => write!(f, "shadow root {id}"),
        }
    }
}

/// Errors raised when attaching an observer.
#[derive(Debug, Error)]
pub enum ObserveError {
    #[error("cannot observe {target}: {reason}")]
    Unavailable { target: String, reason: String },
}

/// Keeps a structural-change subscription alive.  Dropping it disconnects.
pub struct ObserverGuard {
    _inner: Box<dyn Send>,
}

impl ObserverGuard {
    pub fn new<T: Send + 'static>(inner: T) -> Self {
        Self {
            _inner: Box::new(inner),
        }
    }
}

/// Where the monitor reads the rendered UI from.
pub trait DocumentSource: Send + Sync {
    /// Whether the document body exists yet.
    fn is_ready(&self) -> bool;

    /// A snapshot of the current document, or `None` if it cannot be read.
    fn snapshot(&self) -> Option<Box<dyn Document>>;

    /// Shadow roots that can currently be found in the document.
    fn shadow_roots(&self) -> Vec<String>;

    /// Sends `()` on `changes` whenever `target` changes structurally.
    fn observe(
        &self,
        target: &ObserveTarget,
        changes: mpsc::UnboundedSender<()>,
    ) -> Result<ObserverGuard, ObserveError>;
}

// ── Monitor ───────────────────────────────────────────────────────────────────

/// A configured, not yet started monitor.
pub struct SkinMonitor {
    config: MonitorConfig,
    source: Arc<dyn DocumentSource>,
    probe: Arc<dyn PortProbe>,
    cache: Arc<dyn PortCache>,
    connector: Arc<dyn Connector>,
    state: watch::Sender<Option<SkinState>>,
    notifications: broadcast::Sender<Notification>,
}

impl SkinMonitor {
    pub fn new(
        config: MonitorConfig,
        source: Arc<dyn DocumentSource>,
        probe: Arc<dyn PortProbe>,
        cache: Arc<dyn PortCache>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let (state, _) = watch::channel(None);
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            config,
            source,
            probe,
            cache,
            connector,
            state,
            notifications,
        }
    }

    /// Subscribes to local notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// The published skin state slot.
    pub fn skin_state(&self) -> PublishedState {
        PublishedState::new(self.state.subscribe())
    }

    /// Spawns the monitor task.
    ///
    /// The task runs until [`MonitorHandle::stop`] is called or the handle is
    /// dropped.
    pub fn start(self) -> MonitorHandle {
        let (stop_tx, stop_rx) = oneshot::channel();
        let (emit_tx, emit_rx) = mpsc::unbounded_channel();
        let skin_state = self.skin_state();
        let notifications = self.notifications.clone();

        let task = tokio::spawn(self.run(stop_rx, emit_rx));

        MonitorHandle {
            stop: stop_tx,
            emits: emit_tx,
            task,
            skin_state,
            notifications,
        }
    }

    async fn run(self, mut stop: oneshot::Receiver<()>, mut emits: mpsc::UnboundedReceiver<Value>) {
        // ── Wait for the document ─────────────────────────────────────────────
        let mut waiting_logged = false;
        while !self.source.is_ready() {
            if !waiting_logged {
                info!("waiting for document body");
                waiting_logged = true;
            }
            tokio::select! {
                _ = &mut stop => return,
                () = sleep(self.config.ready_poll_interval) => {}
            }
        }

        // ── Locate and connect the bridge ─────────────────────────────────────
        let resolver = PortResolver::new(
            self.config.discovery.clone(),
            Arc::clone(&self.probe),
            Arc::clone(&self.cache),
        );
        let resolution = tokio::select! {
            _ = &mut stop => return,
            resolution = resolver.resolve() => resolution,
        };
        debug!(
            "bridge endpoint {} ({:?})",
            resolution.endpoint, resolution.source
        );

        let (bridge, mut inbound) = spawn_bridge(
            resolution.endpoint.url(),
            Arc::clone(&self.connector),
            self.config.reconnect_delay,
        );
        bridge.connect();

        // ── Observe and sample ────────────────────────────────────────────────
        let (changes_tx, mut changes) = mpsc::unbounded_channel();
        let mut observers = Vec::new();
        self.attach_observers(&mut observers, &changes_tx);

        let period = self.config.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut detector = ChangeDetector::new();
        let dispatcher = EventDispatcher::new(self.state.clone(), self.notifications.clone());

        self.report(sample(self.source.as_ref(), &self.config.selectors, &mut detector), &bridge);

        loop {
            tokio::select! {
                _ = &mut stop => break,
                Some(()) = changes.recv() => {
                    // One re-read covers a burst of notifications.
                    while changes.try_recv().is_ok() {}
                    self.report(sample(self.source.as_ref(), &self.config.selectors, &mut detector), &bridge);
                }
                _ = ticker.tick() => {
                    self.report(sample(self.source.as_ref(), &self.config.selectors, &mut detector), &bridge);
                }
                Some(frame) = inbound.recv() => dispatcher.dispatch(&frame, &mut detector),
                Some(value) = emits.recv() => {
                    if let Err(e) = bridge.send_json(&value) {
                        warn!("could not emit to bridge: {e}");
                    }
                }
            }
        }

        observers.clear();
        bridge.stop();
        info!("skin monitor stopped");
    }

    /// Replaces `observers` with fresh ones on the body and every shadow root.
    fn attach_observers(&self, observers: &mut Vec<ObserverGuard>, changes: &mpsc::UnboundedSender<()>) {
        observers.clear();

        match self.source.observe(&ObserveTarget::Body, changes.clone()) {
            Ok(guard) => observers.push(guard),
            Err(e) => warn!("{e}; relying on polling"),
        }

        for root in self.source.shadow_roots() {
            match self.source.observe(&ObserveTarget::ShadowRoot(root), changes.clone()) {
                Ok(guard) => observers.push(guard),
                Err(e) => warn!("{e}"),
            }
        }
    }

    fn report(&self, observation: Option<SkinObservation>, bridge: &BridgeHandle) {
        let Some(observation) = observation else {
            return;
        };
        info!("hovered skin: {}", observation.name);
        if let Err(e) = bridge.send_json(&observation.to_message()) {
            warn!("could not send hovered skin to bridge: {e}");
        }
    }
}

/// Reads the document once and feeds the detector.
///
/// Kept synchronous: document snapshots are not `Send` and must never live
/// across an await point.
fn sample(
    source: &dyn DocumentSource,
    selectors: &[String],
    detector: &mut ChangeDetector,
) -> Option<SkinObservation> {
    let document = source.snapshot()?;
    let name = read_current_skin(document.as_ref(), selectors);
    detector.observe(name)
}

// ── Handle ────────────────────────────────────────────────────────────────────

/// Controls a running monitor.  Dropping the handle stops the monitor.
pub struct MonitorHandle {
    stop: oneshot::Sender<()>,
    emits: mpsc::UnboundedSender<Value>,
    task: JoinHandle<()>,
    skin_state: PublishedState,
    notifications: broadcast::Sender<Notification>,
}

impl MonitorHandle {
    /// Sends an arbitrary JSON record to the bridge.
    ///
    /// Records emitted before the bridge endpoint is known are held back and
    /// sent in order once the bridge client exists.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Stopped`] if the monitor task has ended.
    pub fn emit(&self, value: Value) -> Result<(), BridgeError> {
        self.emits.send(value).map_err(|_| BridgeError::Stopped)
    }

    pub fn skin_state(&self) -> PublishedState {
        self.skin_state.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Stops observing, closes the bridge socket, and waits for the task to end.
    pub async fn stop(self) {
        let MonitorHandle { stop, task, .. } = self;
        let _ = stop.send(());
        if let Err(e) = task.await {
            warn!("monitor task ended abnormally: {e}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
