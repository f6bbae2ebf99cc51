//! Persistent blacklist for H2H landing-info enrichment.
//!
//! Maps a payment-method tag to the Unix time (seconds, fractional) at which
//! it may be tried again. The whole map is read once when opened. Mutations
//! only touch memory and mark the map dirty; the file is rewritten in full by
//! [`H2hBlacklist::flush`], or by whoever takes [`H2hBlacklist::take_pending`]
//! (the async client does the write on a blocking thread). There is no file
//! locking: two processes sharing the same path can overwrite each other's
//! entries, last writer wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current time as fractional Unix seconds.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Read the blacklist file. Missing, unreadable or malformed files yield an empty map.
pub fn load(path: &Path) -> HashMap<String, f64> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read H2H blacklist cache");
            return HashMap::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed H2H blacklist cache");
            HashMap::new()
        }
    }
}

/// Overwrite the blacklist file with `entries`. Failures are logged, never returned.
pub fn save(path: &Path, entries: &HashMap<String, f64>) {
    let json = match serde_json::to_string(entries) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize H2H blacklist cache");
            return;
        }
    };

    if let Err(e) = std::fs::write(path, json) {
        tracing::warn!(path = %path.display(), error = %e, "failed to save H2H blacklist cache");
    }
}

/// In-memory view of the blacklist file.
///
/// No method here performs I/O except [`open`](Self::open) and
/// [`flush`](Self::flush), so it is safe to mutate under a lock inside async
/// code and write the snapshot elsewhere.
#[derive(Debug)]
pub struct H2hBlacklist {
    path: PathBuf,
    entries: HashMap<String, f64>,
    dirty: bool,
}

/// Snapshot of the map that still has to reach disk.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub path: PathBuf,
    pub entries: HashMap<String, f64>,
}

impl PendingWrite {
    pub fn save(&self) {
        save(&self.path, &self.entries);
    }
}

impl H2hBlacklist {
    /// Load the blacklist stored at `path` (empty if absent or corrupt).
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load(&path);
        Self {
            path,
            entries,
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Expiry recorded for `key`, if any (expired or not).
    pub fn expiry(&self, key: &str) -> Option<f64> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when the in-memory map differs from what was last written.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True while `key` has an unexpired entry. An expired entry is removed.
    pub fn is_blacklisted(&mut self, key: &str, now: f64) -> bool {
        match self.entries.get(key) {
            None => false,
            Some(&expiry) if now < expiry => true,
            Some(_) => {
                self.entries.remove(key);
                self.dirty = true;
                false
            }
        }
    }

    /// Blacklist `key` until `now + duration`.
    pub fn blacklist(&mut self, key: &str, now: f64, duration: Duration) {
        self.entries
            .insert(key.to_string(), now + duration.as_secs_f64());
        self.dirty = true;
    }

    /// Drop any entry for `key`.
    pub fn clear(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.dirty = true;
        }
    }

    /// Hand the unsaved state to the caller and mark the map clean.
    pub fn take_pending(&mut self) -> Option<PendingWrite> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(PendingWrite {
            path: self.path.clone(),
            entries: self.entries.clone(),
        })
    }

    /// Write unsaved changes on the current thread.
    pub fn flush(&mut self) {
        if let Some(pending) = self.take_pending() {
            pending.save();
        }
    }
}
