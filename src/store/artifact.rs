//! The artifact store: a key-addressed blob store with two logical
//! namespaces (`tracking/`, `reports/`).
//!
//! The trait shape follows `flyingrobots-echo/crates/echo-cas`'s
//! `BlobStore` adapted from pure content-addressing to an explicit
//! key API; a `sha2` content hash is still exposed via `stat` so
//! callers can detect whether two writes under different keys are
//! byte-identical, without the store itself addressing by hash.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{PitchSenseError, Result};
use crate::store::table::Table;

pub const NAMESPACE_TRACKING: &str = "tracking";
pub const NAMESPACE_REPORTS: &str = "reports";

pub fn tracking_key(match_id: &str) -> String {
    format!("{NAMESPACE_TRACKING}/{match_id}.table")
}

pub fn report_key(report_id: &str) -> String {
    format!("{NAMESPACE_REPORTS}/{report_id}.json")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectStat {
    pub size: usize,
    pub content_type: String,
    pub content_hash: String,
}

struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// Key-addressed blob store contract. Implementations must be safe
/// for concurrent readers; writers for the same key are serialized
/// and the last write wins.
pub trait ArtifactStore: Send + Sync {
    fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;
    fn get_object(&self, key: &str) -> Result<Vec<u8>>;
    fn stat(&self, key: &str) -> Result<ObjectStat>;
    fn remove(&self, key: &str) -> Result<()>;

    fn put_table(&self, key: &str, table: &Table) -> Result<()> {
        let bytes = table.encode()?;
        self.put_object(key, bytes, "application/x-pitchsense-table")
    }

    fn get_table(&self, key: &str) -> Result<Table> {
        let bytes = self.get_object(key)?;
        let mut table = Table::decode(&bytes)?;
        table.ensure_sorted();
        Ok(table)
    }
}

#[derive(Default)]
pub struct InMemoryArtifactStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let mut objects = self.objects.write();
        objects.insert(key.to_string(), StoredObject { bytes, content_type: content_type.to_string() });
        Ok(())
    }

    fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .get(key)
            .map(|o| o.bytes.clone())
            .ok_or_else(|| PitchSenseError::NotFound(format!("artifact {key}")))
    }

    fn stat(&self, key: &str) -> Result<ObjectStat> {
        let objects = self.objects.read();
        let obj = objects.get(key).ok_or_else(|| PitchSenseError::NotFound(format!("artifact {key}")))?;
        let mut hasher = Sha256::new();
        hasher.update(&obj.bytes);
        Ok(ObjectStat {
            size: obj.bytes.len(),
            content_type: obj.content_type.clone(),
            content_hash: hex::encode(hasher.finalize()),
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.objects.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trajectory::{ObjectKind, TrajectoryPoint};

    #[test]
    fn put_get_object_round_trip() {
        let store = InMemoryArtifactStore::new();
        store.put_object(&report_key("r1"), b"hello".to_vec(), "application/json").unwrap();
        assert_eq!(store.get_object(&report_key("r1")).unwrap(), b"hello");
    }

    #[test]
    fn get_missing_object_is_not_found() {
        let store = InMemoryArtifactStore::new();
        assert!(matches!(store.get_object("reports/missing.json"), Err(PitchSenseError::NotFound(_))));
    }

    #[test]
    fn stat_reports_size_and_content_type() {
        let store = InMemoryArtifactStore::new();
        store.put_object("reports/r1.json", b"12345".to_vec(), "application/json").unwrap();
        let stat = store.stat("reports/r1.json").unwrap();
        assert_eq!(stat.size, 5);
        assert_eq!(stat.content_type, "application/json");
        assert!(!stat.content_hash.is_empty());
    }

    #[test]
    fn last_write_wins_on_same_key() {
        let store = InMemoryArtifactStore::new();
        store.put_object("reports/r1.json", b"first".to_vec(), "application/json").unwrap();
        store.put_object("reports/r1.json", b"second".to_vec(), "application/json").unwrap();
        assert_eq!(store.get_object("reports/r1.json").unwrap(), b"second");
    }

    #[test]
    fn put_get_table_round_trip() {
        let store = InMemoryArtifactStore::new();
        let points = vec![TrajectoryPoint {
            frame_id: 0,
            track_id: 1,
            x: 10.0,
            y: 20.0,
            object_kind: ObjectKind::Player,
            team: None,
            confidence: None,
            timestamp: 0.0,
        }];
        let table = Table::from_trajectory_points(&points);
        let key = tracking_key("match-1");
        store.put_table(&key, &table).unwrap();
        let read_back = store.get_table(&key).unwrap();
        assert_eq!(read_back.rows.len(), 1);
    }

    #[test]
    fn remove_then_get_is_not_found() {
        let store = InMemoryArtifactStore::new();
        store.put_object("reports/r1.json", b"x".to_vec(), "application/json").unwrap();
        store.remove("reports/r1.json").unwrap();
        assert!(store.get_object("reports/r1.json").is_err());
    }
}
