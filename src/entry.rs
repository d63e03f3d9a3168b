//! Tracked file pairs and timestamp-based reconciliation.
//!
//! An [`Entry`] is one primary/secondary pair. Reconciliation compares each
//! side's modification time against the baseline captured after the last
//! successful copy and propagates whichever side changed, with the primary
//! always taking priority when both sides changed in the same cycle.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// One tracked primary/secondary file pair.
///
/// The stored stamps always reflect the state after the most recent
/// successful reconciliation (or the initial baseline capture). Any
/// observed delta counts as a change, not just a newer timestamp.
#[derive(Debug, Clone)]
pub struct Entry {
    primary: PathBuf,
    secondary: PathBuf,
    two_way: bool,
    primary_stamp: SystemTime,
    secondary_stamp: SystemTime,
}

impl Entry {
    /// Open a persisted pair, capturing baseline stamps from both files.
    ///
    /// Fails if either file cannot be stat'ed; a pair without baselines
    /// cannot be reconciled meaningfully.
    pub fn open(
        primary: impl Into<PathBuf>,
        secondary: impl Into<PathBuf>,
        two_way: bool,
    ) -> io::Result<Self> {
        let primary = primary.into();
        let secondary = secondary.into();
        let primary_stamp = mtime(&primary)?;
        let secondary_stamp = mtime(&secondary)?;
        Ok(Self {
            primary,
            secondary,
            two_way,
            primary_stamp,
            secondary_stamp,
        })
    }

    /// Create a newly selected pair.
    ///
    /// Seeds the secondary from the primary when the secondary does not
    /// exist yet, then captures baselines like [`Entry::open`].
    pub fn create(
        primary: impl Into<PathBuf>,
        secondary: impl Into<PathBuf>,
        two_way: bool,
    ) -> io::Result<Self> {
        let primary = primary.into();
        let secondary = secondary.into();
        if !secondary.exists() {
            copy_with_mtime(&primary, &secondary)?;
        }
        Self::open(primary, secondary, two_way)
    }

    pub fn primary(&self) -> &Path {
        &self.primary
    }

    pub fn secondary(&self) -> &Path {
        &self.secondary
    }

    pub fn two_way(&self) -> bool {
        self.two_way
    }

    pub fn set_two_way(&mut self, two_way: bool) {
        self.two_way = two_way;
    }

    /// Check whether this entry tracks the same pair of paths.
    pub fn same_pair(&self, other: &Entry) -> bool {
        self.primary == other.primary && self.secondary == other.secondary
    }

    /// Carry over another entry's reconciliation baselines.
    ///
    /// Used when the sync loop adopts a fresh snapshot of the tracked set:
    /// pairs that survive the edit keep their stamps instead of reverting
    /// to the foreground's creation-time baselines.
    pub fn adopt_stamps(&mut self, old: &Entry) {
        self.primary_stamp = old.primary_stamp;
        self.secondary_stamp = old.secondary_stamp;
    }

    /// Insert the parent folder of both paths into the given set.
    ///
    /// Pure projection used to build the watch set; no effect on the entry.
    pub fn add_folders(&self, folders: &mut BTreeSet<PathBuf>) {
        if let Some(parent) = self.primary.parent() {
            folders.insert(parent.to_path_buf());
        }
        if let Some(parent) = self.secondary.parent() {
            folders.insert(parent.to_path_buf());
        }
    }

    /// Run one reconciliation pass over this pair.
    ///
    /// All I/O failures are swallowed: an inaccessible file skips the entry
    /// for this cycle and a failed copy leaves the stamps untouched so the
    /// next cycle retries the same detected change. The primary is checked
    /// first, unconditionally of `two_way`, so it wins simultaneous changes.
    pub fn reconcile(&mut self) {
        let Ok(observed) = mtime(&self.primary) else {
            return;
        };

        if observed != self.primary_stamp {
            // The primary changed. Copy it over the secondary.
            tracing::debug!(
                "[entry] primary changed: {} -> {}",
                self.primary.display(),
                self.secondary.display()
            );
            if copy_with_mtime(&self.primary, &self.secondary).is_err() {
                return;
            }
            self.stamp_from_primary(observed);
            return;
        }

        if !self.two_way {
            return;
        }

        let Ok(observed) = mtime(&self.secondary) else {
            return;
        };
        if observed != self.secondary_stamp {
            // The secondary changed. Copy it back over the primary.
            tracing::debug!(
                "[entry] secondary changed: {} -> {}",
                self.secondary.display(),
                self.primary.display()
            );
            if copy_with_mtime(&self.secondary, &self.primary).is_err() {
                return;
            }
            self.stamp_from_primary(observed);
        }
    }

    /// Set both stamps to the freshly re-read post-copy timestamp of the
    /// primary, so any normalization the filesystem applied during the copy
    /// is captured rather than assumed. Falls back to the observed value if
    /// the re-read fails.
    fn stamp_from_primary(&mut self, observed: SystemTime) {
        let stamp = mtime(&self.primary).unwrap_or(observed);
        self.primary_stamp = stamp;
        self.secondary_stamp = stamp;
    }
}

/// Read a file's modification time.
pub(crate) fn mtime(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

/// Copy `src` over `dst` and give `dst` the source's modification time.
///
/// `std::fs::copy` does not preserve timestamps, but the reconciliation
/// baselines rely on both sides sharing the source's mtime after a copy.
pub(crate) fn copy_with_mtime(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst)?;
    let stamp = mtime(src)?;
    fs::File::options()
        .write(true)
        .open(dst)?
        .set_modified(stamp)?;
    Ok(())
}
