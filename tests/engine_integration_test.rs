//! End-to-end tests driving the engine through real folder notifications.
//!
//! Watcher delivery is asynchronous, so these tests rewrite the source file
//! in a retry loop until the change propagates (or a generous deadline
//! passes). A rewrite that races the watch-set rebuild is simply retried.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use pairsync::{Entry, Settings, SyncEngine};
use tempfile::TempDir;

const DEADLINE: Duration = Duration::from_secs(10);
const RETRY: Duration = Duration::from_millis(200);

fn settings() -> Settings {
    Settings::default()
}

/// Repeatedly write `contents` to `path` until `target` holds `contents`.
fn write_until_synced(path: &Path, target: &Path, contents: &str) -> bool {
    let start = Instant::now();
    while start.elapsed() < DEADLINE {
        fs::write(path, contents).unwrap();
        std::thread::sleep(RETRY);
        if fs::read_to_string(target).map(|c| c == contents).unwrap_or(false) {
            return true;
        }
    }
    false
}

fn make_pair(dir: &TempDir, name: &str, two_way: bool) -> (PathBuf, PathBuf, Entry) {
    let primary = dir.path().join("main").join(format!("{name}.txt"));
    let secondary = dir.path().join("backup").join(format!("{name}.bak"));
    fs::create_dir_all(primary.parent().unwrap()).unwrap();
    fs::create_dir_all(secondary.parent().unwrap()).unwrap();
    fs::write(&primary, "v1").unwrap();
    fs::write(&secondary, "v1").unwrap();
    let entry = Entry::open(&primary, &secondary, two_way).unwrap();
    (primary, secondary, entry)
}

#[test]
fn test_primary_change_propagates_to_secondary() {
    let dir = TempDir::new().unwrap();
    let (primary, secondary, entry) = make_pair(&dir, "x", true);

    let engine = SyncEngine::start(vec![entry], &settings());
    assert!(
        write_until_synced(&primary, &secondary, "v2"),
        "primary change never reached the secondary"
    );
    engine.shutdown();
}

#[test]
fn test_two_way_secondary_change_propagates_back() {
    let dir = TempDir::new().unwrap();
    let (primary, secondary, entry) = make_pair(&dir, "x", true);

    let engine = SyncEngine::start(vec![entry], &settings());
    assert!(
        write_until_synced(&secondary, &primary, "backup edit"),
        "secondary change never reached the primary"
    );
    engine.shutdown();
}

#[test]
fn test_one_way_secondary_change_is_ignored() {
    let dir = TempDir::new().unwrap();
    let (primary, secondary, entry) = make_pair(&dir, "x", false);

    let engine = SyncEngine::start(vec![entry], &settings());
    fs::write(&secondary, "backup edit").unwrap();
    std::thread::sleep(Duration::from_millis(1500));

    assert_eq!(fs::read_to_string(&primary).unwrap(), "v1");
    assert_eq!(fs::read_to_string(&secondary).unwrap(), "backup edit");
    engine.shutdown();
}

#[test]
fn test_pair_added_at_runtime_is_watched() {
    let dir = TempDir::new().unwrap();
    let (_seed_primary, _seed_secondary, entry) = make_pair(&dir, "seed", false);

    let engine = SyncEngine::start(vec![entry], &settings());

    // A brand new pair in folders the loop was not watching at startup.
    let primary = dir.path().join("late").join("y.txt");
    let secondary = dir.path().join("late-backup").join("y.bak");
    fs::create_dir_all(primary.parent().unwrap()).unwrap();
    fs::create_dir_all(secondary.parent().unwrap()).unwrap();
    fs::write(&primary, "v1").unwrap();
    engine.add_entry(&primary, &secondary, false).unwrap();

    // The seeding copy happens immediately.
    assert_eq!(fs::read_to_string(&secondary).unwrap(), "v1");

    assert!(
        write_until_synced(&primary, &secondary, "v2"),
        "runtime-added pair never synchronized"
    );
    engine.shutdown();
}

#[test]
fn test_disabled_engine_ignores_changes() {
    let dir = TempDir::new().unwrap();
    let (primary, secondary, entry) = make_pair(&dir, "x", false);

    let engine = SyncEngine::start(vec![entry], &settings());
    engine.set_enabled(false);

    fs::write(&primary, "while disabled").unwrap();
    std::thread::sleep(Duration::from_millis(1500));
    assert_eq!(fs::read_to_string(&secondary).unwrap(), "v1");

    // Re-enabling gates the next wake-up back in; nothing is replayed.
    engine.set_enabled(true);
    assert!(
        write_until_synced(&primary, &secondary, "after enable"),
        "change after re-enable never propagated"
    );
    engine.shutdown();
}

#[test]
fn test_removed_pair_stops_synchronizing() {
    let dir = TempDir::new().unwrap();
    let (primary, secondary, entry) = make_pair(&dir, "x", false);

    let engine = SyncEngine::start(vec![entry], &settings());
    assert!(engine.remove_entry(0));

    // Give the loop time to adopt the empty snapshot before writing, so
    // the change cannot race the rebuild.
    std::thread::sleep(Duration::from_millis(500));
    fs::write(&primary, "orphaned change").unwrap();
    std::thread::sleep(Duration::from_millis(1500));
    assert_eq!(fs::read_to_string(&secondary).unwrap(), "v1");
    engine.shutdown();
}

#[test]
fn test_shutdown_wins_over_queued_rebuilds() {
    let dir = TempDir::new().unwrap();
    let (_primary, _secondary, entry) = make_pair(&dir, "x", false);

    let engine = SyncEngine::start(vec![entry], &settings());
    for _ in 0..20 {
        engine.notify_entries_changed();
    }
    // Must return promptly even with a full control queue.
    engine.shutdown();
}

#[test]
fn test_missing_secondary_folder_does_not_kill_loop() {
    let dir = TempDir::new().unwrap();
    let (primary, secondary, entry) = make_pair(&dir, "x", false);

    let engine = SyncEngine::start(vec![entry], &settings());

    // Removing the backup folder makes both watch registration and the
    // copy fail; the loop keeps running and self-heals once it returns.
    fs::remove_file(&secondary).unwrap();
    fs::remove_dir(secondary.parent().unwrap()).unwrap();
    fs::write(&primary, "into the void").unwrap();
    std::thread::sleep(Duration::from_millis(500));

    fs::create_dir_all(secondary.parent().unwrap()).unwrap();
    assert!(
        write_until_synced(&primary, &secondary, "recovered"),
        "loop did not recover after the backup folder came back"
    );
    engine.shutdown();
}
