//! Append-only legal ledger store.
//!
//! Entries live in memory in append order; with a configured path every
//! committed entry is also written as one JSONL line and flushed before
//! the in-memory commit, so the file holds exactly the committed chain
//! and an external auditor can re-verify it without this service.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;

use crate::logic::chain;
use crate::models::{ChainReport, EntryDigest, EventType, LedgerEntry};

/// Ledger failure kinds.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The durable write could not be committed; nothing was appended
    /// and the caller may retry.
    #[error("ledger store unavailable: {0}")]
    Unavailable(#[from] std::io::Error),
    /// The persisted ledger failed verification during replay. Surfaced
    /// as an audit finding, never repaired.
    #[error("ledger corrupted at sequence {sequence}: {reason}")]
    Corrupted { sequence: u64, reason: String },
}

#[derive(Debug)]
struct Inner {
    entries: Vec<LedgerEntry>,
    sink: Option<BufWriter<File>>,
}

/// Append-only, tamper-evident event store.
#[derive(Debug)]
pub struct LedgerStore {
    inner: RwLock<Inner>,
}

impl LedgerStore {
    /// Volatile store with no durable file (tests, ephemeral runs).
    pub fn in_memory() -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: Vec::new(),
                sink: None,
            }),
        }
    }

    /// Open (or create) a file-backed store, replaying any existing
    /// entries. Refuses to open on a broken chain: appending on top of
    /// a tampered file would silently fork it.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let entries = match File::open(path) {
            Ok(file) => Self::replay(BufReader::new(file))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            inner: RwLock::new(Inner {
                entries,
                sink: Some(BufWriter::new(file)),
            }),
        })
    }

    fn replay(reader: impl BufRead) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut entries: Vec<LedgerEntry> = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: LedgerEntry =
                serde_json::from_str(&line).map_err(|err| LedgerError::Corrupted {
                    sequence: entries.len() as u64,
                    reason: format!("unparsable record: {err}"),
                })?;
            let linked = match entries.last() {
                Some(prev) => {
                    entry.sequence == prev.sequence + 1 && chain::verify_link(prev, &entry)
                }
                None => entry.sequence == 0 && chain::verify_genesis(&entry),
            };
            if !linked {
                return Err(LedgerError::Corrupted {
                    sequence: entry.sequence,
                    reason: "hash chain does not verify".to_string(),
                });
            }
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Seal and commit one new entry.
    ///
    /// The write lock serializes all appenders: two concurrent calls can
    /// never read the same head, so sequence numbers and the chain never
    /// fork. The durable write happens before the in-memory commit; a
    /// failed flush surfaces `Unavailable` and leaves no phantom entry.
    pub fn append(&self, event_type: EventType, payload: Value) -> Result<LedgerEntry, LedgerError> {
        let mut inner = self.inner.write();
        let sequence = inner.entries.len() as u64;
        let prev_hash = inner
            .entries
            .last()
            .map(|entry| entry.hash)
            .unwrap_or(EntryDigest::GENESIS);
        let timestamp = chain::truncate_to_micros(Utc::now());
        let hash = chain::entry_digest(sequence, &timestamp, event_type, &payload, &prev_hash);
        let entry = LedgerEntry {
            sequence,
            timestamp,
            event_type,
            payload,
            prev_hash,
            hash,
        };
        if let Some(sink) = inner.sink.as_mut() {
            let line = serde_json::to_string(&entry).map_err(|err| {
                LedgerError::Unavailable(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
            })?;
            sink.write_all(line.as_bytes())?;
            sink.write_all(b"\n")?;
            sink.flush()?;
        }
        inner.entries.push(entry.clone());
        Ok(entry)
    }

    /// All entries in append order (ascending sequence). Newest-first is
    /// a presentation concern of the caller.
    pub fn list(&self) -> Vec<LedgerEntry> {
        self.inner.read().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Walk the chain in ascending order and report the first broken
    /// link, if any.
    pub fn verify_chain(&self) -> ChainReport {
        verify_entries(&self.inner.read().entries)
    }
}

/// Chain verification over a slice of entries, usable on a live store's
/// snapshot or on independently loaded records.
pub fn verify_entries(entries: &[LedgerEntry]) -> ChainReport {
    for (index, entry) in entries.iter().enumerate() {
        let linked = if index == 0 {
            entry.sequence == 0 && chain::verify_genesis(entry)
        } else {
            entry.sequence == index as u64 && chain::verify_link(&entries[index - 1], entry)
        };
        if !linked {
            return ChainReport {
                valid: false,
                first_broken_sequence: Some(index as u64),
            };
        }
    }
    ChainReport {
        valid: true,
        first_broken_sequence: None,
    }
}
