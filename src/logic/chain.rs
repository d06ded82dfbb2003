//! Hash chaining between consecutive ledger entries.
//!
//! Canonicalization scheme v1, frozen: the digest preimage is the
//! sequence number as 8 big-endian bytes, the RFC 3339 UTC timestamp
//! truncated to microseconds, the event-type string, the canonical
//! payload JSON (object keys in lexicographic order, compact
//! separators), and the 32 raw bytes of `prev_hash`. Changing any part
//! of this makes previously sealed entries unverifiable, so it must be
//! versioned rather than edited.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::models::{EntryDigest, EventType, LedgerEntry};

/// Canonical JSON text of a payload: compact, keys sorted.
///
/// serde_json's default map is ordered by key at every nesting level,
/// so a straight compact serialization is stable across runs and
/// across a persist/re-parse round trip.
pub fn canonical_payload(payload: &Value) -> String {
    payload.to_string()
}

/// Canonical timestamp text: RFC 3339 UTC at microsecond precision.
pub fn canonical_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Truncate a timestamp to the precision the canonical form keeps.
/// Entries are stamped with this so the persisted record re-hashes
/// byte-identically.
pub fn truncate_to_micros(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(timestamp.timestamp_micros()).unwrap_or(timestamp)
}

/// Digest over an entry's hashed fields (everything except `hash`).
pub fn entry_digest(
    sequence: u64,
    timestamp: &DateTime<Utc>,
    event_type: EventType,
    payload: &Value,
    prev_hash: &EntryDigest,
) -> EntryDigest {
    let mut hasher = Sha256::new();
    hasher.update(sequence.to_be_bytes());
    hasher.update(canonical_timestamp(timestamp).as_bytes());
    hasher.update(event_type.as_str().as_bytes());
    hasher.update(canonical_payload(payload).as_bytes());
    hasher.update(prev_hash.as_bytes());
    EntryDigest(hasher.finalize().into())
}

/// Recompute an entry's digest from its stored fields.
pub fn recompute(entry: &LedgerEntry) -> EntryDigest {
    entry_digest(
        entry.sequence,
        &entry.timestamp,
        entry.event_type,
        &entry.payload,
        &entry.prev_hash,
    )
}

/// True iff `entry` correctly extends `prev`: the back-pointer matches
/// and the stored hash matches a fresh recomputation.
pub fn verify_link(prev: &LedgerEntry, entry: &LedgerEntry) -> bool {
    entry.prev_hash == prev.hash && entry.hash == recompute(entry)
}

/// Genesis check for entry 0: anchored to the all-zero digest.
pub fn verify_genesis(entry: &LedgerEntry) -> bool {
    entry.prev_hash == EntryDigest::GENESIS && entry.hash == recompute(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sealed(sequence: u64, payload: Value, prev_hash: EntryDigest) -> LedgerEntry {
        let timestamp = truncate_to_micros(Utc::now());
        let hash = entry_digest(sequence, &timestamp, EventType::Detection, &payload, &prev_hash);
        LedgerEntry {
            sequence,
            timestamp,
            event_type: EventType::Detection,
            payload,
            prev_hash,
            hash,
        }
    }

    #[test]
    fn test_digest_is_deterministic() {
        let timestamp = truncate_to_micros(Utc::now());
        let payload = json!({"score": 0.91, "severity": "Tier 1 (Probable)"});
        let a = entry_digest(3, &timestamp, EventType::Detection, &payload, &EntryDigest::GENESIS);
        let b = entry_digest(3, &timestamp, EventType::Detection, &payload, &EntryDigest::GENESIS);
        assert_eq!(a, b);
    }

    #[test]
    fn test_payload_key_order_does_not_matter() {
        let first: Value = serde_json::from_str(r#"{"a": 1, "b": 2.5}"#).unwrap();
        let second: Value = serde_json::from_str(r#"{"b": 2.5, "a": 1}"#).unwrap();
        assert_eq!(canonical_payload(&first), canonical_payload(&second));
    }

    #[test]
    fn test_verify_link_detects_tampering() {
        let genesis = sealed(0, json!({"score": 0.2}), EntryDigest::GENESIS);
        let next = sealed(1, json!({"score": 0.9}), genesis.hash);
        assert!(verify_genesis(&genesis));
        assert!(verify_link(&genesis, &next));

        let mut tampered = next.clone();
        tampered.payload = json!({"score": 0.1});
        assert!(!verify_link(&genesis, &tampered));

        let mut reparented = next;
        reparented.prev_hash = EntryDigest([7u8; 32]);
        assert!(!verify_link(&genesis, &reparented));
    }

    #[test]
    fn test_canonical_timestamp_survives_roundtrip() {
        let timestamp = truncate_to_micros(Utc::now());
        let text = canonical_timestamp(&timestamp);
        let parsed: DateTime<Utc> = text.parse().unwrap();
        assert_eq!(canonical_timestamp(&parsed), text);
    }
}
