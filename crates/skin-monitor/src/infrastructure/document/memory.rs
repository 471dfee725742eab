//! In-memory document source.
//!
//! Holds a selector → elements table that callers edit directly.  Useful for
//! tests and for embedders that already extract the UI state themselves.
//! Every edit made through [`MemoryDocumentSource::set_elements`] notifies
//! the body observers, like a DOM mutation would.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::mpsc;

use skin_monitor_core::{Document, ElementSnapshot};

use crate::application::monitor::{DocumentSource, ObserveError, ObserveTarget, ObserverGuard};

type Table = HashMap<String, Vec<ElementSnapshot>>;

struct Subscription {
    target: ObserveTarget,
    alive: Weak<()>,
    changes: mpsc::UnboundedSender<()>,
}

#[derive(Default)]
struct Inner {
    has_body: bool,
    elements: Table,
    shadow_roots: Vec<String>,
    unobservable: HashSet<String>,
    subscriptions: Vec<Subscription>,
}

/// A shared, mutable document.  Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryDocumentSource {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDocumentSource {
    /// An empty document whose body exists.
    pub fn new() -> Self {
        let source = Self::default();
        source.lock().has_body = true;
        source
    }

    /// A document that is still loading.
    pub fn without_body() -> Self {
        Self::default()
    }

    /// Marks the body as present.
    pub fn attach_body(&self) {
        self.lock().has_body = true;
    }

    /// Replaces the elements matching `selector` and notifies body observers.
    pub fn set_elements(&self, selector: &str, elements: Vec<ElementSnapshot>) {
        let mut inner = self.lock();
        inner.elements.insert(selector.to_string(), elements);
        notify(&mut inner, |target| *target == ObserveTarget::Body);
    }

    /// Replaces the elements matching `selector` without notifying anyone,
    /// like a text edit that does not change the tree.
    pub fn set_elements_silently(&self, selector: &str, elements: Vec<ElementSnapshot>) {
        self.lock().elements.insert(selector.to_string(), elements);
    }

    /// Removes every element.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.elements.clear();
        notify(&mut inner, |target| *target == ObserveTarget::Body);
    }

    pub fn add_shadow_root(&self, id: &str) {
        self.lock().shadow_roots.push(id.to_string());
    }

    /// Adds a shadow root that refuses observers.
    pub fn add_unobservable_shadow_root(&self, id: &str) {
        let mut inner = self.lock();
        inner.shadow_roots.push(id.to_string());
        inner.unobservable.insert(id.to_string());
    }

    /// Notifies the observers of one shadow root.
    pub fn touch_shadow_root(&self, id: &str) {
        let mut inner = self.lock();
        notify(&mut inner, |target| {
            matches!(target, ObserveTarget::ShadowRoot(root) if root == id)
        });
    }

    /// Number of observers whose guard is still alive.
    pub fn observer_count(&self) -> usize {
        let mut inner = self.lock();
        inner.subscriptions.retain(|s| s.alive.strong_count() > 0);
        inner.subscriptions.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn notify(inner: &mut Inner, matches: impl Fn(&ObserveTarget) -> bool) {
    inner
        .subscriptions
        .retain(|s| s.alive.strong_count() > 0 && !s.changes.is_closed());
    for subscription in inner.subscriptions.iter().filter(|s| matches(&s.target)) {
        let _ = subscription.changes.send(());
    }
}

impl DocumentSource for MemoryDocumentSource {
    fn is_ready(&self) -> bool {
        self.lock().has_body
    }

    fn snapshot(&self) -> Option<Box<dyn Document>> {
        let inner = self.lock();
        if !inner.has_body {
            return None;
        }
        Some(Box::new(MemoryDocument(inner.elements.clone())))
    }

    fn shadow_roots(&self) -> Vec<String> {
        self.lock().shadow_roots.clone()
    }

    fn observe(
        &self,
        target: &ObserveTarget,
        changes: mpsc::UnboundedSender<()>,
    ) -> Result<ObserverGuard, ObserveError> {
        let mut inner = self.lock();
        if let ObserveTarget::ShadowRoot(id) = target {
            if inner.unobservable.contains(id) {
                return Err(ObserveError::Unavailable {
                    target: target.to_string(),
                    reason: "shadow root is closed".to_string(),
                });
            }
        }

        let alive = Arc::new(());
        inner.subscriptions.push(Subscription {
            target: target.clone(),
            alive: Arc::downgrade(&alive),
            changes,
        });
        Ok(ObserverGuard::new(alive))
    }
}

/// A frozen copy of the table.
struct MemoryDocument(Table);

impl Document for MemoryDocument {
    fn query_all(&self, selector: &str) -> Vec<ElementSnapshot> {
        self.0.get(selector).cloned().unwrap_or_default()
    }
}
