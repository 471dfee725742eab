//! Persistent port cache.
//!
//! The last bridge port that answered discovery is remembered between runs so
//! the next start usually needs a single probe.  The store is a flat TOML
//! table of string keys to string values in the platform config directory:
//!
//! - Windows:  `%APPDATA%\RoseSkinMonitor\cache.toml`
//! - Linux:    `~/.config/rose-skin-monitor/cache.toml`
//! - macOS:    `~/Library/Application Support/RoseSkinMonitor/cache.toml`
//!
//! ```toml
//! rose_bridge_port = "50003"
//! ```
//!
//! Non-string values are read back in their TOML form, so a hand-written
//! `rose_bridge_port = 50003` still loads as `"50003"`.  A file that does not
//! parse at all is replaced on the next `store` or `remove`.
//!
//! [`MemoryPortCache`] is the in-process equivalent used in tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::application::resolve_port::{CacheError, PortCache};

type Entries = BTreeMap<String, String>;

// ── TOML file cache ───────────────────────────────────────────────────────────

/// A [`PortCache`] backed by a TOML file.
#[derive(Debug, Clone)]
pub struct TomlPortCache {
    path: PathBuf,
}

impl TomlPortCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A cache at the platform default location.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Unavailable`] when the platform config directory
    /// cannot be determined from the environment.
    pub fn at_default_location() -> Result<Self, CacheError> {
        Ok(Self::new(default_cache_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Entries, CacheError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let table: toml::Table = toml::from_str(&content).map_err(|e| {
                    CacheError::Unavailable(format!("failed to parse {}: {e}", self.path.display()))
                })?;
                Ok(table
                    .into_iter()
                    .map(|(key, value)| match value {
                        toml::Value::String(text) => (key, text),
                        // Hand-edited files: `rose_bridge_port = 50003`.
                        other => (key, other.to_string()),
                    })
                    .collect())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(CacheError::Unavailable(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn write_entries(&self, entries: &Entries) -> Result<(), CacheError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| {
                CacheError::Unavailable(format!("failed to create {}: {e}", dir.display()))
            })?;
        }

        let content = toml::to_string_pretty(entries)
            .map_err(|e| CacheError::Unavailable(format!("failed to serialize cache: {e}")))?;
        std::fs::write(&self.path, content).map_err(|e| {
            CacheError::Unavailable(format!("failed to write {}: {e}", self.path.display()))
        })
    }
}

impl PortCache for TomlPortCache {
    fn load(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.read_entries()?.remove(key))
    }

    fn store(&self, key: &str, value: &str) -> Result<(), CacheError> {
        // A corrupt file is replaced rather than blocking the write.
        let mut entries = self.read_entries().unwrap_or_else(|e| {
            debug!("discarding unreadable port cache: {e}");
            Entries::new()
        });
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(e) => {
                debug!("discarding unreadable port cache: {e}");
                return self.write_entries(&Entries::new());
            }
        };
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.write_entries(&entries)
    }
}

/// Resolves the full path of the default cache file.
///
/// # Errors
///
/// Returns [`CacheError::Unavailable`] if the base directory cannot be determined.
pub fn default_cache_path() -> Result<PathBuf, CacheError> {
    platform_config_dir()
        .map(|dir| dir.join("cache.toml"))
        .ok_or_else(|| CacheError::Unavailable("could not determine platform config directory".into()))
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("RoseSkinMonitor"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("rose-skin-monitor"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("RoseSkinMonitor")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── In-memory cache ───────────────────────────────────────────────────────────

/// A [`PortCache`] that lives only as long as the process.
///
/// Also counts removals so tests can assert that a stale entry was cleared
/// even when a new value was written afterwards.
#[derive(Debug, Default)]
pub struct MemoryPortCache {
    entries: Mutex<Entries>,
    removals: Mutex<usize>,
}

impl MemoryPortCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache pre-populated with one entry.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let cache = Self::new();
        if let Ok(mut entries) = cache.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        cache
    }

    /// The current value of `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    /// How many times an existing entry was removed.
    pub fn removals(&self) -> usize {
        self.removals.lock().map(|n| *n).unwrap_or(0)
    }

    fn poisoned() -> CacheError {
        CacheError::Unavailable("memory cache lock poisoned".to_string())
    }
}

impl PortCache for MemoryPortCache {
    fn load(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.lock().map_err(|_| Self::poisoned())?.get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.entries
            .lock()
            .map_err(|_| Self::poisoned())?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let removed = self
            .entries
            .lock()
            .map_err(|_| Self::poisoned())?
            .remove(key)
            .is_some();
        if removed {
            *self.removals.lock().map_err(|_| Self::poisoned())? += 1;
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
