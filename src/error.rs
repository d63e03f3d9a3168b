//! Error types for the synchronization engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from engine operations.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to initialize folder watcher: {reason}")]
    WatchInit { reason: String },

    #[error("Cannot watch folder {path}: {reason}")]
    FolderWatch { path: PathBuf, reason: String },

    #[error("Cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Control channel closed unexpectedly")]
    ChannelClosed,
}

impl From<notify::Error> for SyncError {
    fn from(e: notify::Error) -> Self {
        SyncError::WatchInit {
            reason: e.to_string(),
        }
    }
}
