//! Durable per-tenant index storage.
//!
//! A save replaces the tenant's whole index in one step: readers observe the
//! previous index or the new one, never a mixture.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use ragdb_core::types::TenantId;
use ragdb_core::{Error, Result, StorageError};

use crate::index::TenantIndex;
use crate::schema;

pub const INDEX_FILE: &str = "index.json";

/// Storage backend for tenant indexes, keyed by [`TenantId`].
pub trait IndexStore: Send + Sync {
    /// Replace any prior index of `index.tenant_id`.
    fn save(&self, index: &TenantIndex) -> Result<()>;

    /// Fails with [`Error::IndexNotFound`] when nothing was saved for `tenant`.
    fn load(&self, tenant: &TenantId) -> Result<Arc<TenantIndex>>;

    fn exists(&self, tenant: &TenantId) -> Result<bool>;
}

/// One artifact per tenant at `<root>/<tenant>/index.json`, replaced by
/// write-to-temp-then-rename.
pub struct FsIndexStore {
    root: PathBuf,
    writers: Mutex<HashMap<TenantId, Arc<Mutex<()>>>>,
}

impl FsIndexStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), writers: Mutex::new(HashMap::new()) }
    }

    pub fn tenant_dir(&self, tenant: &TenantId) -> PathBuf {
        self.root.join(tenant.as_str())
    }

    pub fn index_path(&self, tenant: &TenantId) -> PathBuf {
        self.tenant_dir(tenant).join(INDEX_FILE)
    }

    // Serialises writers of one tenant; other tenants only share the map lookup.
    fn writer_lock(&self, tenant: &TenantId) -> Arc<Mutex<()>> {
        let mut writers = self.writers.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        writers.entry(tenant.clone()).or_default().clone()
    }

    // Drop the tenant's lock once no other writer holds or waits on it.
    fn release_writer_lock(&self, tenant: &TenantId, lock: Arc<Mutex<()>>) {
        let mut writers = self.writers.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // one reference in the map, one in `lock`
        if Arc::strong_count(&lock) == 2 {
            writers.remove(tenant);
        }
    }

    fn write_artifact(&self, dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
        tmp.write_all(bytes).map_err(|e| StorageError::io(tmp.path(), e))?;
        tmp.as_file().sync_all().map_err(|e| StorageError::io(tmp.path(), e))?;
        tmp.persist(path).map_err(|e| StorageError::io(path, e.error))?;
        #[cfg(unix)]
        fs::File::open(dir)
            .and_then(|d| d.sync_all())
            .map_err(|e| StorageError::io(dir, e))?;
        Ok(())
    }
}

impl IndexStore for FsIndexStore {
    fn save(&self, index: &TenantIndex) -> Result<()> {
        let bytes = schema::encode(index)?;
        let dir = self.tenant_dir(&index.tenant_id);
        let path = dir.join(INDEX_FILE);
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;

        let lock = self.writer_lock(&index.tenant_id);
        let written = {
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            self.write_artifact(&dir, &path, &bytes)
        };
        self.release_writer_lock(&index.tenant_id, lock);
        written?;

        info!(
            tenant = %index.tenant_id,
            chunks = index.chunks.len(),
            terms = index.vocabulary.len(),
            bytes = bytes.len(),
            "saved index"
        );
        Ok(())
    }

    fn load(&self, tenant: &TenantId) -> Result<Arc<TenantIndex>> {
        let path = self.index_path(tenant);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::not_found(tenant.as_str())),
            Err(e) => return Err(StorageError::io(&path, e).into()),
        };
        let index = schema::decode(&bytes, &path).map_err(|e| {
            warn!(tenant = %tenant, error = %e, "rejected index artifact");
            e
        })?;
        if &index.tenant_id != tenant {
            return Err(StorageError::corrupt(
                &path,
                format!("artifact belongs to tenant {}", index.tenant_id),
            )
            .into());
        }
        debug!(tenant = %tenant, chunks = index.chunks.len(), "loaded index");
        Ok(Arc::new(index))
    }

    fn exists(&self, tenant: &TenantId) -> Result<bool> {
        let path = self.index_path(tenant);
        path.try_exists().map_err(|e| StorageError::io(&path, e).into())
    }
}

/// Process-local store. Saving swaps the tenant's `Arc` snapshot, so readers
/// holding the old one are unaffected.
#[derive(Default)]
pub struct MemoryIndexStore {
    indexes: RwLock<HashMap<TenantId, Arc<TenantIndex>>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndexStore for MemoryIndexStore {
    fn save(&self, index: &TenantIndex) -> Result<()> {
        let snapshot = Arc::new(index.clone());
        let mut indexes = self.indexes.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        indexes.insert(index.tenant_id.clone(), snapshot);
        Ok(())
    }

    fn load(&self, tenant: &TenantId) -> Result<Arc<TenantIndex>> {
        let indexes = self.indexes.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        indexes.get(tenant).cloned().ok_or_else(|| Error::not_found(tenant.as_str()))
    }

    fn exists(&self, tenant: &TenantId) -> Result<bool> {
        let indexes = self.indexes.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(indexes.contains_key(tenant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdb_text::TfidfVectorizer;
    use std::thread;

    fn index_for(tenant: &str) -> TenantIndex {
        let (vocabulary, vectors) = TfidfVectorizer::default().fit::<&str>(&[]);
        TenantIndex::new(TenantId::new(tenant).unwrap(), vocabulary, vectors, Vec::new(), Vec::new())
    }

    #[test]
    fn writer_locks_are_released_after_saving() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = FsIndexStore::new(tmp.path());
        thread::scope(|s| {
            for i in 0..16 {
                let store = &store;
                s.spawn(move || {
                    for _ in 0..4 {
                        store.save(&index_for(&format!("tenant{}", i % 4))).unwrap();
                    }
                });
            }
        });
        assert!(store.writers.lock().unwrap().is_empty());
        assert!(store.exists(&TenantId::new("tenant3").unwrap()).unwrap());
    }

    #[test]
    fn case_variants_share_one_artifact_path() {
        let store = FsIndexStore::new("/data");
        let upper = TenantId::new("Tenant1").unwrap();
        let lower = TenantId::new("tenant1").unwrap();
        assert_eq!(store.index_path(&upper), store.index_path(&lower));
        assert_eq!(store.index_path(&lower), PathBuf::from("/data/tenant1/index.json"));
    }
}
