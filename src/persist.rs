//! Persistence of the tracked set to a line-oriented text file.
//!
//! One record per line, fields tab-delimited:
//! `<primary>\t<secondary>\t<0|1>\n`. A malformed or truncated line stops
//! parsing of the remainder of the file; records parsed so far are kept.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::entry::Entry;
use crate::error::SyncError;

const DELIMITER: char = '\t';

/// One persisted record: the pair's paths and direction, without the
/// runtime baselines an [`Entry`] carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub primary: PathBuf,
    pub secondary: PathBuf,
    pub two_way: bool,
}

impl Record {
    fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split(DELIMITER);
        let primary = fields.next().filter(|f| !f.is_empty())?;
        let secondary = fields.next().filter(|f| !f.is_empty())?;
        let flag = fields.next()?;
        Some(Self {
            primary: PathBuf::from(primary),
            secondary: PathBuf::from(secondary),
            two_way: flag != "0",
        })
    }

    fn serialize(&self) -> String {
        format!(
            "{}{DELIMITER}{}{DELIMITER}{}",
            self.primary.display(),
            self.secondary.display(),
            if self.two_way { '1' } else { '0' }
        )
    }
}

impl From<&Entry> for Record {
    fn from(entry: &Entry) -> Self {
        Self {
            primary: entry.primary().to_path_buf(),
            secondary: entry.secondary().to_path_buf(),
            two_way: entry.two_way(),
        }
    }
}

/// Load raw records without touching the referenced files.
///
/// A missing file yields an empty set; a malformed line aborts parsing of
/// the rest of the file.
pub fn load_records(path: &Path) -> Vec<Record> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("[persist] cannot read {}: {e}", path.display());
            }
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    for line in contents.lines() {
        match Record::parse(line) {
            Some(record) => records.push(record),
            None => {
                tracing::warn!(
                    "[persist] malformed record in {}, keeping {} entries loaded so far",
                    path.display(),
                    records.len()
                );
                break;
            }
        }
    }
    records
}

/// Load the tracked set, capturing fresh baseline stamps for every pair.
///
/// A record whose baseline capture fails (either file missing or
/// inaccessible) stops loading further records, matching the malformed-line
/// policy. Partial load, never a hard failure.
pub fn load_entries(path: &Path) -> Vec<Entry> {
    let mut entries = Vec::new();
    for record in load_records(path) {
        match Entry::open(&record.primary, &record.secondary, record.two_way) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!(
                    "[persist] cannot open pair {}: {e}, keeping {} entries loaded so far",
                    record.primary.display(),
                    entries.len()
                );
                break;
            }
        }
    }
    entries
}

/// Write all records, creating parent directories as needed.
pub fn save_records(path: &Path, records: &[Record]) -> Result<(), SyncError> {
    let io_err = |source: io::Error| SyncError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut out = String::new();
    for record in records {
        out.push_str(&record.serialize());
        out.push('\n');
    }
    fs::write(path, out).map_err(io_err)
}

/// Write the tracked set; stamps are not round-tripped.
pub fn save_entries(path: &Path, entries: &[Entry]) -> Result<(), SyncError> {
    let records: Vec<Record> = entries.iter().map(Record::from).collect();
    save_records(path, &records)
}
