//! In-process store.
//!
//! Keeps each record as its serialized JSON, exactly as a browser's local
//! storage would, so round-trips go through the same encoding as every
//! other backend.

use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::{decode, encode, next_revision, StoreResult, VaultStore};
use crate::primitives::Address;
use crate::vault::model::VaultStorage;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<Address, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl VaultStore for MemoryStore {
    fn save(&self, vault_id: &Address, record: &mut VaultStorage) -> StoreResult<()> {
        let mut records = self.records.write();
        let stored = match records.get(vault_id) {
            Some(bytes) => Some(decode(bytes)?.version),
            None => None,
        };
        let next = next_revision(vault_id, record, stored)?;
        records.insert(vault_id.clone(), encode(&next)?);
        record.version = next.version;
        Ok(())
    }

    fn load(&self, vault_id: &Address) -> StoreResult<Option<VaultStorage>> {
        match self.records.read().get(vault_id) {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    fn list(&self) -> StoreResult<Vec<Address>> {
        Ok(self.records.read().keys().cloned().collect())
    }

    fn delete(&self, vault_id: &Address) -> StoreResult<bool> {
        Ok(self.records.write().remove(vault_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support;

    #[test]
    fn satisfies_store_contract() {
        let store = MemoryStore::new();
        test_support::exercise(&store);
        assert_eq!(store.len(), 1);
    }
}
