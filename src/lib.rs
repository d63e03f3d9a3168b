pub mod config;
pub mod control;
pub mod engine;
pub mod entry;
pub mod error;
pub mod logging;
pub mod persist;
pub mod watch;

pub use config::Settings;
pub use engine::SyncEngine;
pub use entry::Entry;
pub use error::SyncError;
pub use persist::{load_entries, save_entries};
