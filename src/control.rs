//! Control messages between the foreground caller and the sync loop.
//!
//! A single typed channel replaces the classic dual-purpose wake signal:
//! one message rebuilds the watch set with a fresh snapshot of the tracked
//! entries, the other requests shutdown. When both are pending, shutdown
//! wins.

use crossbeam_channel::Receiver;

use crate::entry::Entry;

/// A wake-up delivered to the sync loop.
#[derive(Debug)]
pub enum ControlMessage {
    /// The tracked set changed. Carries a complete ownership-transferred
    /// snapshot, so the loop never reads shared entry state.
    Rebuild(Vec<Entry>),
    /// Stop the loop. Takes precedence over any pending rebuilds.
    Shutdown,
}

/// Collapse the received message plus everything still queued into one
/// effective message.
///
/// Rapid bursts of rebuild requests coalesce into a single rebuild using
/// the latest snapshot; a shutdown anywhere in the queue discards the rest.
pub fn coalesce(first: ControlMessage, rx: &Receiver<ControlMessage>) -> ControlMessage {
    let mut effective = first;
    loop {
        if matches!(effective, ControlMessage::Shutdown) {
            return effective;
        }
        match rx.try_recv() {
            Ok(msg) => effective = msg,
            Err(_) => return effective,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_coalesce_keeps_latest_rebuild() {
        let (tx, rx) = unbounded();
        tx.send(ControlMessage::Rebuild(Vec::new())).unwrap();
        tx.send(ControlMessage::Rebuild(Vec::new())).unwrap();

        let first = rx.recv().unwrap();
        let effective = coalesce(first, &rx);

        assert!(matches!(effective, ControlMessage::Rebuild(_)));
        // The queue was drained: two sends, one effective rebuild.
        assert!(rx.is_empty());
    }

    #[test]
    fn test_shutdown_takes_precedence() {
        let (tx, rx) = unbounded();
        tx.send(ControlMessage::Rebuild(Vec::new())).unwrap();
        tx.send(ControlMessage::Shutdown).unwrap();
        tx.send(ControlMessage::Rebuild(Vec::new())).unwrap();

        let first = rx.recv().unwrap();
        assert!(matches!(coalesce(first, &rx), ControlMessage::Shutdown));
    }

    #[test]
    fn test_immediate_shutdown_skips_drain() {
        let (tx, rx) = unbounded();
        tx.send(ControlMessage::Rebuild(Vec::new())).unwrap();

        // A shutdown already in hand short-circuits without draining.
        assert!(matches!(
            coalesce(ControlMessage::Shutdown, &rx),
            ControlMessage::Shutdown
        ));
        assert!(!rx.is_empty());
    }

    #[test]
    fn test_single_message_passes_through() {
        let (_tx, rx) = unbounded::<ControlMessage>();
        let effective = coalesce(ControlMessage::Rebuild(Vec::new()), &rx);
        assert!(matches!(effective, ControlMessage::Rebuild(_)));
    }
}
