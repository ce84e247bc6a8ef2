//! Directory-of-JSON-files store.
//!
//! ```text
//! <dir>/
//!   0x3f…a1.json
//!   0x9c…07.json
//! ```
//!
//! Writes go to a `.tmp` sibling and are renamed into place, so a reader
//! never sees a half-written record. An in-process mutex serializes the
//! version check with the write; separate processes sharing the directory
//! are not coordinated.

use parking_lot::Mutex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{decode, encode, next_revision, StoreResult, VaultStore};
use crate::primitives::Address;
use crate::vault::model::VaultStorage;

const EXTENSION: &str = "json";

#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Opens (and creates if needed) the store directory.
    pub fn open<P: AsRef<Path>>(dir: P) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, vault_id: &Address) -> PathBuf {
        self.dir.join(format!("{}.{EXTENSION}", vault_id.as_str()))
    }

    fn read(&self, vault_id: &Address) -> StoreResult<Option<VaultStorage>> {
        match fs::read(self.path_for(vault_id)) {
            Ok(bytes) => Ok(Some(decode(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl VaultStore for FileStore {
    fn save(&self, vault_id: &Address, record: &mut VaultStorage) -> StoreResult<()> {
        let _guard = self.write_lock.lock();
        let stored = self.read(vault_id)?.map(|r| r.version);
        let next = next_revision(vault_id, record, stored)?;

        let path = self.path_for(vault_id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, encode(&next)?)?;
        fs::rename(&tmp, &path)?;

        record.version = next.version;
        tracing::trace!(vault = %vault_id, version = next.version, "vault record written");
        Ok(())
    }

    fn load(&self, vault_id: &Address) -> StoreResult<Option<VaultStorage>> {
        self.read(vault_id)
    }

    fn list(&self) -> StoreResult<Vec<Address>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            // Ignore stray files that are not named after a vault.
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<Address>().ok())
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn delete(&self, vault_id: &Address) -> StoreResult<bool> {
        let _guard = self.write_lock.lock();
        match fs::remove_file(self.path_for(vault_id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support;

    #[test]
    fn satisfies_store_contract() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path()).unwrap();
        test_support::exercise(&store);
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut rec = test_support::record("persisted");
        let id = rec.address().clone();
        {
            let store = FileStore::open(dir.path()).unwrap();
            store.save(&id, &mut rec).unwrap();
        }
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.load(&id).unwrap().unwrap(), rec);
    }

    #[test]
    fn amounts_are_decimal_strings_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path()).unwrap();
        let mut rec = test_support::record("on-disk");
        let id = rec.address().clone();
        store.save(&id, &mut rec).unwrap();

        let raw = fs::read_to_string(dir.path().join(format!("{}.json", id))).unwrap();
        assert!(raw.contains("\"10000000000000000000000\""));
    }

    #[test]
    fn list_skips_foreign_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("notes.txt"), "hi").unwrap();
        fs::write(dir.path().join("not-an-address.json"), "{}").unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.list().unwrap().is_empty());
    }
}
