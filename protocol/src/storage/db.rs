//! # Sled-backed Store
//!
//! Vault records live in a single sled tree:
//!
//! | Tree     | Key                  | Value                 |
//! |----------|----------------------|-----------------------|
//! | `vaults` | address (UTF-8)      | `json(VaultStorage)`  |
//!
//! The version check uses sled's `compare_and_swap` against the exact bytes
//! that were read, so two writers racing on one vault cannot both win even
//! across threads.

use sled::{Db, Tree};
use std::path::Path;

use super::{decode, encode, next_revision, StoreError, StoreResult, VaultStore};
use crate::primitives::Address;
use crate::vault::model::VaultStorage;

const VAULTS_TREE: &str = "vaults";

#[derive(Debug, Clone)]
pub struct SledStore {
    db: Db,
    vaults: Tree,
}

impl SledStore {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::from_db(sled::open(path)?)
    }

    /// In-memory database removed on drop. For tests.
    pub fn open_temporary() -> StoreResult<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let vaults = db.open_tree(VAULTS_TREE)?;
        Ok(Self { db, vaults })
    }

    pub fn vault_count(&self) -> usize {
        self.vaults.len()
    }

    /// Block until all writes are durable.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl VaultStore for SledStore {
    fn save(&self, vault_id: &Address, record: &mut VaultStorage) -> StoreResult<()> {
        let key = vault_id.as_str().as_bytes();
        let current = self.vaults.get(key)?;
        let stored = match &current {
            Some(bytes) => Some(decode(bytes)?.version),
            None => None,
        };
        let next = next_revision(vault_id, record, stored)?;

        let swapped = self
            .vaults
            .compare_and_swap(key, current, Some(encode(&next)?))?;
        if swapped.is_err() {
            // Someone else wrote between our get and our swap.
            let found = self
                .vaults
                .get(key)?
                .map(|b| decode(&b).map(|r| r.version))
                .transpose()?
                .unwrap_or(0);
            return Err(StoreError::VersionConflict {
                vault: vault_id.clone(),
                expected: record.version,
                found,
            });
        }

        self.db.flush()?;
        record.version = next.version;
        Ok(())
    }

    fn load(&self, vault_id: &Address) -> StoreResult<Option<VaultStorage>> {
        match self.vaults.get(vault_id.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn list(&self) -> StoreResult<Vec<Address>> {
        let mut ids = Vec::new();
        for entry in self.vaults.iter() {
            let (key, _) = entry?;
            let s = std::str::from_utf8(&key)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            let id = s
                .parse::<Address>()
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            ids.push(id);
        }
        // sled iterates in key order, and keys are lower-case hex.
        Ok(ids)
    }

    fn delete(&self, vault_id: &Address) -> StoreResult<bool> {
        let removed = self.vaults.remove(vault_id.as_str().as_bytes())?.is_some();
        self.db.flush()?;
        Ok(removed)
    }
}
