//! Legal ledger records

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Categories of ledger events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// A threshold calibration run was sealed.
    Calibration,
    /// A scored observation was classified and sealed.
    Detection,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Calibration => "CALIBRATION",
            EventType::Detection => "DETECTION",
        }
    }
}

/// A 32-byte SHA-256 digest, serialized as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryDigest(pub [u8; 32]);

impl EntryDigest {
    /// All-zero digest anchoring the chain (entry 0's `prev_hash`).
    pub const GENESIS: EntryDigest = EntryDigest([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(text: &str) -> Result<Self, hex::FromHexError> {
        let mut out = [0u8; 32];
        hex::decode_to_slice(text, &mut out)?;
        Ok(Self(out))
    }
}

impl Serialize for EntryDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EntryDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        EntryDigest::from_hex(&text).map_err(D::Error::custom)
    }
}

/// One immutable entry in the append-only legal ledger.
///
/// `hash` covers every other field (see `logic::chain`), and `prev_hash`
/// equals the previous entry's `hash`, so any post-hoc edit to a stored
/// entry is detectable by re-walking the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub payload: serde_json::Value,
    pub prev_hash: EntryDigest,
    pub hash: EntryDigest,
}

/// Listing row for `GET /legal-logs`, in ascending append order; the
/// dashboard reverses for newest-first display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalLogSummary {
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub hash: EntryDigest,
}

impl From<&LedgerEntry> for LegalLogSummary {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            event_type: entry.event_type,
            hash: entry.hash,
        }
    }
}

/// Outcome of walking the whole chain link by link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    pub valid: bool,
    pub first_broken_sequence: Option<u64>,
}
