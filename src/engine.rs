//! The synchronization engine: tracked set ownership and the sync loop.
//!
//! Two threads only. The foreground thread owns the canonical tracked set
//! and issues control messages; exactly one background loop thread blocks
//! on folder notifications plus the control channel and reconciles entries
//! sequentially. The loop never reads shared entry state: every change to
//! the tracked set is handed over as a complete snapshot, so torn reads
//! are impossible by construction.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

use crate::config::Settings;
use crate::control::{ControlMessage, coalesce};
use crate::entry::Entry;
use crate::watch::{WatchGuard, watch_dirs};

/// States of the sync loop.
#[derive(Debug)]
enum LoopState {
    /// Blocked on folder notifications and the control channel.
    Waiting,
    /// Running one sequential pass over all entries.
    Reconciling,
    /// Adopting a fresh snapshot of the tracked set.
    Rebuilding(Vec<Entry>),
    /// Terminal; no transitions out.
    Stopped,
}

/// The background half of the engine. Owns its snapshot of the entries.
struct SyncLoop {
    entries: Vec<Entry>,
    control: Receiver<ControlMessage>,
    enabled: Arc<AtomicBool>,
    max_watched_dirs: usize,
}

impl SyncLoop {
    fn run(mut self) {
        let mut state = LoopState::Waiting;
        loop {
            state = match state {
                LoopState::Waiting => self.wait(),
                LoopState::Reconciling => self.reconcile_all(),
                LoopState::Rebuilding(next) => self.rebuild(next),
                LoopState::Stopped => {
                    crate::log_event!("sync", "stopped");
                    return;
                }
            };
        }
    }

    /// Open fresh watch handles, block until something happens, and close
    /// the handles again before acting on it.
    fn wait(&mut self) -> LoopState {
        let dirs = watch_dirs(&self.entries, self.max_watched_dirs);
        let guard = match WatchGuard::new(&dirs) {
            Ok(guard) => guard,
            Err(e) => {
                // Watch setup failure is transient. Block on the control
                // channel alone and retry the folder set next cycle.
                tracing::warn!("[sync] watch setup failed: {e}");
                return match self.control.recv() {
                    Ok(msg) => self.on_control(msg),
                    Err(_) => LoopState::Stopped,
                };
            }
        };

        crossbeam_channel::select! {
            recv(self.control) -> msg => match msg {
                Ok(msg) => self.on_control(msg),
                // The engine was dropped without an explicit shutdown.
                Err(_) => LoopState::Stopped,
            },
            recv(guard.events()) -> event => match event {
                Ok(Ok(_)) if self.enabled.load(Ordering::Relaxed) => LoopState::Reconciling,
                Ok(Ok(_)) => {
                    crate::debug_event!("sync", "change ignored while disabled");
                    LoopState::Waiting
                }
                // Watcher-level errors count as "no folder change".
                Ok(Err(e)) => {
                    tracing::warn!("[sync] watch error: {e}");
                    LoopState::Waiting
                }
                Err(_) => LoopState::Waiting,
            },
        }
        // `guard` drops here: handles never outlive the wait.
    }

    /// Collapse pending control traffic into a single transition.
    fn on_control(&self, msg: ControlMessage) -> LoopState {
        match coalesce(msg, &self.control) {
            ControlMessage::Rebuild(next) => LoopState::Rebuilding(next),
            ControlMessage::Shutdown => LoopState::Stopped,
        }
    }

    /// One sequential reconciliation pass over all entries.
    ///
    /// No per-entry parallelism on purpose: copies within the same small
    /// folder set would contend, and sequential passes need no locking.
    fn reconcile_all(&mut self) -> LoopState {
        crate::debug_event!("sync", "reconciling", "{} pairs", self.entries.len());
        for entry in &mut self.entries {
            entry.reconcile();
        }
        LoopState::Waiting
    }

    /// Adopt a snapshot of the tracked set from the foreground thread.
    ///
    /// Pairs that survive the edit keep their current reconciliation
    /// baselines; reverting to creation-time stamps would re-copy files
    /// that changed since the pair was first loaded.
    fn rebuild(&mut self, mut next: Vec<Entry>) -> LoopState {
        for entry in &mut next {
            if let Some(old) = self.entries.iter().find(|old| old.same_pair(entry)) {
                entry.adopt_stamps(old);
            }
        }
        self.entries = next;
        crate::log_event!("sync", "watch set rebuilt", "{} pairs", self.entries.len());
        LoopState::Waiting
    }
}

/// The foreground facade around the sync loop.
///
/// Owns the canonical tracked set. All mutations happen here and are pushed
/// to the loop thread as snapshots through the control channel.
pub struct SyncEngine {
    entries: Mutex<Vec<Entry>>,
    control: Sender<ControlMessage>,
    enabled: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SyncEngine {
    /// Spawn the sync loop thread seeded with the given tracked set.
    pub fn start(entries: Vec<Entry>, settings: &Settings) -> Self {
        let (control_tx, control_rx) = unbounded();
        let enabled = Arc::new(AtomicBool::new(settings.enabled));

        let sync_loop = SyncLoop {
            entries: entries.clone(),
            control: control_rx,
            enabled: enabled.clone(),
            max_watched_dirs: settings.max_watched_dirs,
        };
        let handle = thread::spawn(move || sync_loop.run());

        crate::log_event!("sync", "started", "{} pairs", entries.len());
        Self {
            entries: Mutex::new(entries),
            control: control_tx,
            enabled,
            handle: Some(handle),
        }
    }

    /// Read-only snapshot of the tracked set for display.
    pub fn entries(&self) -> Vec<Entry> {
        self.entries.lock().clone()
    }

    /// Track a new pair, seeding the secondary if it does not exist yet.
    pub fn add_entry(
        &self,
        primary: impl Into<PathBuf>,
        secondary: impl Into<PathBuf>,
        two_way: bool,
    ) -> io::Result<()> {
        let entry = Entry::create(primary, secondary, two_way)?;
        {
            let mut entries = self.entries.lock();
            entries.push(entry);
        }
        self.notify_entries_changed();
        Ok(())
    }

    /// Stop tracking the pair at `index`. Does not delete either file.
    ///
    /// Returns false without side effects when the index is out of range.
    pub fn remove_entry(&self, index: usize) -> bool {
        {
            let mut entries = self.entries.lock();
            if index >= entries.len() {
                return false;
            }
            entries.remove(index);
        }
        self.notify_entries_changed();
        true
    }

    /// Switch the pair at `index` between one-way and two-way mode.
    pub fn set_two_way(&self, index: usize, two_way: bool) -> bool {
        {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(index) else {
                return false;
            };
            entry.set_two_way(two_way);
        }
        self.notify_entries_changed();
        true
    }

    /// Gate folder-change reconciliation on or off.
    ///
    /// Does not wake the loop or restructure the watch set; a disabled
    /// engine keeps watching and simply ignores the wake-ups.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
        crate::log_event!("sync", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Wake the loop with a fresh snapshot of the tracked set.
    pub fn notify_entries_changed(&self) {
        let snapshot = self.entries.lock().clone();
        // A send failure means the loop already stopped; nothing to wake.
        let _ = self.control.send(ControlMessage::Rebuild(snapshot));
    }

    /// Stop the loop and wait for the thread to exit.
    ///
    /// Returns only after the loop has actually stopped, so the caller can
    /// release dependent resources deterministically. Effective even
    /// mid-reconciliation: the shutdown is observed on the next wait.
    pub fn shutdown(mut self) {
        let _ = self.control.send(ControlMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("[sync] loop thread panicked during shutdown");
            }
        }
    }
}
