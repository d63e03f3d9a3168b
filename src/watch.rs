//! Watch set derivation and scoped folder-change notification handles.
//!
//! The watch set is a pure projection of the tracked entries: the
//! de-duplicated parent folders of every path on both sides of every pair.
//! It is recomputed before each wait and the native handles are dropped as
//! soon as the wait returns, so a stale handle never outlives one cycle.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crossbeam_channel::Receiver;
use notify::{Event, RecursiveMode, Watcher};

use crate::entry::Entry;
use crate::error::SyncError;

/// Compute the folders to watch for the given tracked set.
///
/// Folders beyond `capacity` are silently dropped from this cycle's
/// registration. The limit is inherited from platforms whose wait
/// primitive caps the number of simultaneously watchable objects; it is
/// surfaced as an explicit configuration knob rather than a hard-coded
/// constant so the truncation policy stays visible.
pub fn watch_dirs(entries: &[Entry], capacity: usize) -> BTreeSet<PathBuf> {
    let mut folders = BTreeSet::new();
    for entry in entries {
        entry.add_folders(&mut folders);
    }

    if folders.len() > capacity {
        tracing::warn!(
            "[watch] {} folders exceed the watch capacity of {capacity}, dropping the rest",
            folders.len()
        );
        while folders.len() > capacity {
            folders.pop_last();
        }
    }

    folders
}

/// A folder-change watcher scoped to a single wait.
///
/// Opening the guard registers every folder with a fresh
/// `notify::RecommendedWatcher`; dropping it releases all native handles.
pub struct WatchGuard {
    events: Receiver<notify::Result<Event>>,
    _watcher: notify::RecommendedWatcher,
}

impl WatchGuard {
    /// Open notification handles for every folder in the set.
    ///
    /// Folders that cannot be registered (deleted, permission denied) are
    /// logged and skipped; a partially registered guard still wakes on the
    /// folders that did register.
    pub fn new(dirs: &BTreeSet<PathBuf>) -> Result<Self, SyncError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })?;

        for dir in dirs {
            if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
                let err = SyncError::FolderWatch {
                    path: dir.clone(),
                    reason: e.to_string(),
                };
                tracing::warn!("[watch] {err}");
            } else {
                crate::debug_event!("watch", "watching", "{}", dir.display());
            }
        }

        Ok(Self {
            events: rx,
            _watcher: watcher,
        })
    }

    /// The receiver the sync loop multiplexes on.
    pub fn events(&self) -> &Receiver<notify::Result<Event>> {
        &self.events
    }
}
