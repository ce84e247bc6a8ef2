//! # Storage Module
//!
//! Persistence for vault records. One JSON document per vault, keyed by the
//! vault's lower-cased address.
//!
//! ## Backends
//!
//! ```text
//! memory.rs: process-local map; the device-local store
//! file.rs  : one <address>.json per vault in a directory; the server store
//! db.rs    : embedded sled tree, for nodes that want a single data file
//! ```
//!
//! Callers hold an `Arc<dyn VaultStore>` chosen by [`open_store`] and never
//! see which backend is behind it.
//!
//! ## Concurrency
//!
//! There is no lock spanning an engine operation's read-modify-write.
//! Instead every record carries a `version`. A save succeeds only if the
//! version on the record matches the stored one (or the record is new with
//! version 0); the store then bumps it. A stale writer gets
//! [`StoreError::VersionConflict`] rather than silently clobbering.

pub mod db;
pub mod file;
pub mod memory;

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::primitives::Address;
use crate::vault::model::VaultStorage;

pub use db::SledStore;
pub use file::FileStore;
pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("version conflict on {vault}: record is at {expected}, store has {found}")]
    VersionConflict {
        vault: Address,
        expected: u64,
        found: u64,
    },

    #[error("record key mismatch: saving {record} under {key}")]
    KeyMismatch { key: Address, record: Address },
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// VaultStore
// ---------------------------------------------------------------------------

/// Keyed persistence for [`VaultStorage`] records.
pub trait VaultStore: Send + Sync {
    /// Persists `record` under `vault_id` if its version matches the stored
    /// one, then bumps `record.version` in place.
    fn save(&self, vault_id: &Address, record: &mut VaultStorage) -> StoreResult<()>;

    fn load(&self, vault_id: &Address) -> StoreResult<Option<VaultStorage>>;

    /// All stored vault ids, sorted.
    fn list(&self) -> StoreResult<Vec<Address>>;

    /// Removes the record. Returns `false` if there was nothing to remove.
    fn delete(&self, vault_id: &Address) -> StoreResult<bool>;
}

/// Which backend to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    File { dir: PathBuf },
    Sled { path: PathBuf },
}

/// Opens the configured backend.
pub fn open_store(backend: &StorageBackend) -> StoreResult<Arc<dyn VaultStore>> {
    let store: Arc<dyn VaultStore> = match backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File { dir } => Arc::new(FileStore::open(dir)?),
        StorageBackend::Sled { path } => Arc::new(SledStore::open(path)?),
    };
    tracing::debug!(?backend, "vault store opened");
    Ok(store)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub(crate) fn encode(record: &VaultStorage) -> StoreResult<Vec<u8>> {
    serde_json::to_vec_pretty(record).map_err(|e| StoreError::Serialization(e.to_string()))
}

pub(crate) fn decode(bytes: &[u8]) -> StoreResult<VaultStorage> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Checks the optimistic version and returns the record as it should be
/// written (version bumped). `stored` is the version currently persisted,
/// `None` if the key is absent.
pub(crate) fn next_revision(
    vault_id: &Address,
    record: &VaultStorage,
    stored: Option<u64>,
) -> StoreResult<VaultStorage> {
    if record.address() != vault_id {
        return Err(StoreError::KeyMismatch {
            key: vault_id.clone(),
            record: record.address().clone(),
        });
    }
    let found = stored.unwrap_or(0);
    if record.version != found {
        return Err(StoreError::VersionConflict {
            vault: vault_id.clone(),
            expected: record.version,
            found,
        });
    }
    let mut next = record.clone();
    next.version = found + 1;
    Ok(next)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::primitives::Amount;
    use crate::time::{CheckInPeriod, PeriodUnit};
    use crate::vault::model::{Allocation, Beneficiary, VaultConfig};
    use chrono::{TimeZone, Utc};

    pub fn record(tag: &str) -> VaultStorage {
        let mut storage = VaultStorage::new(VaultConfig::new(
            Address::derive(tag.as_bytes()),
            Address::derive(b"owner"),
            1,
            CheckInPeriod::new(1, PeriodUnit::Days),
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        ));
        storage.config.total_value = Amount::new(10_000_000_000_000_000_000_000);
        for name in ["carol", "alice", "bob"] {
            storage.beneficiaries.push(Beneficiary::new(
                Address::derive(name.as_bytes()),
                name,
                Allocation::native(3_333_333_333_333_333_333_333u128),
            ));
        }
        storage
    }

    /// Contract every backend must satisfy.
    pub fn exercise(store: &dyn VaultStore) {
        let mut rec = record("vault-a");
        let id = rec.address().clone();

        assert!(store.load(&id).unwrap().is_none());
        store.save(&id, &mut rec).unwrap();
        assert_eq!(rec.version, 1);

        let loaded = store.load(&id).unwrap().expect("saved record");
        assert_eq!(loaded, rec);
        let names: Vec<_> = loaded.beneficiaries.iter().map(|b| b.name.clone()).collect();
        assert_eq!(names, ["carol", "alice", "bob"]);

        // A second writer holding the old version is rejected.
        let mut stale = loaded.clone();
        stale.version = 0;
        assert!(matches!(
            store.save(&id, &mut stale),
            Err(StoreError::VersionConflict { expected: 0, found: 1, .. })
        ));

        // Saving under the wrong key is refused.
        let mut other = record("vault-b");
        assert!(matches!(
            store.save(&id, &mut other),
            Err(StoreError::KeyMismatch { .. })
        ));

        let mut rec_b = record("vault-b");
        store.save(&rec_b.address().clone(), &mut rec_b).unwrap();
        let mut listed = vec![id.clone(), rec_b.address().clone()];
        listed.sort();
        assert_eq!(store.list().unwrap(), listed);

        assert!(store.delete(&id).unwrap());
        assert!(!store.delete(&id).unwrap());
        assert!(store.load(&id).unwrap().is_none());
        assert_eq!(store.list().unwrap().len(), 1);
    }
}
