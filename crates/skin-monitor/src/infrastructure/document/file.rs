//! HTML snapshot files as a [`DocumentSource`].
//!
//! The client UI is dumped to disk by an external exporter: one file with the
//! main document and, optionally, one file per shadow root.  The monitor
//! reads the main file and watches every file with `notify`; a change to any
//! of them triggers a re-read.
//!
//! Files are watched through their parent directory so that exporters that
//! replace the file (write to temp, then rename) keep being observed.

use std::path::{Path, PathBuf};

use notify::{EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::debug;

use skin_monitor_core::Document;

use crate::application::monitor::{DocumentSource, ObserveError, ObserveTarget, ObserverGuard};
use crate::infrastructure::document::html::HtmlDocument;

/// Reads the document from HTML files on disk.
#[derive(Debug, Clone)]
pub struct HtmlFileSource {
    body: PathBuf,
    shadow_roots: Vec<PathBuf>,
}

impl HtmlFileSource {
    pub fn new(body: impl Into<PathBuf>, shadow_roots: Vec<PathBuf>) -> Self {
        Self {
            body: body.into(),
            shadow_roots,
        }
    }

    fn path_of(&self, target: &ObserveTarget) -> PathBuf {
        match target {
            ObserveTarget::Body => self.body.clone(),
            ObserveTarget::ShadowRoot(id) => PathBuf::from(id),
        }
    }
}

impl DocumentSource for HtmlFileSource {
    fn is_ready(&self) -> bool {
        self.body.is_file()
    }

    fn snapshot(&self) -> Option<Box<dyn Document>> {
        match std::fs::read_to_string(&self.body) {
            Ok(markup) => Some(Box::new(HtmlDocument::parse(&markup))),
            Err(e) => {
                debug!("could not read {}: {e}", self.body.display());
                None
            }
        }
    }

    fn shadow_roots(&self) -> Vec<String> {
        self.shadow_roots
            .iter()
            .filter(|path| path.is_file())
            .map(|path| path.display().to_string())
            .collect()
    }

    fn observe(
        &self,
        target: &ObserveTarget,
        changes: mpsc::UnboundedSender<()>,
    ) -> Result<ObserverGuard, ObserveError> {
        let path = self.path_of(target);
        let unavailable = |reason: String| ObserveError::Unavailable {
            target: target.to_string(),
            reason,
        };

        let file_name = path
            .file_name()
            .map(ToOwned::to_owned)
            .ok_or_else(|| unavailable(format!("{} is not a file path", path.display())))?;
        let dir = watch_dir(&path);

        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<notify::Event>| match result {
                Ok(event) => {
                    let relevant = matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) && event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == Some(file_name.as_os_str()));
                    if relevant {
                        let _ = changes.send(());
                    }
                }
                Err(e) => debug!("document watcher error: {e}"),
            })
            .map_err(|e| unavailable(e.to_string()))?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| unavailable(e.to_string()))?;
        debug!("watching {} for changes", path.display());

        Ok(ObserverGuard::new(watcher))
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
