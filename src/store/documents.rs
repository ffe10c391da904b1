//! In-memory document store with file snapshots
//!
//! Records are kept in insertion order. Reads hand out cloned snapshots
//! taken under a single read lock, so a search always sees a consistent
//! set of records.

use super::{encode_vector, DocumentId, DocumentRecord, StoreError, StoreResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct StoreState {
    next_id: u64,
    records: IndexMap<DocumentId, DocumentRecord>,
}

/// On-disk snapshot layout
#[derive(Serialize, Deserialize)]
struct StoredDocuments {
    next_id: u64,
    records: Vec<DocumentRecord>,
}

/// Thread-safe document store
#[derive(Debug, Default)]
pub struct DocumentStore {
    state: RwLock<StoreState>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store snapshot, or start empty if the file does not exist
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No document store at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        let reader = BufReader::new(File::open(path)?);
        let stored: StoredDocuments = bincode::deserialize_from(reader)?;
        info!("Loaded {} documents from {}", stored.records.len(), path.display());

        let records = stored.records.into_iter().map(|r| (r.id, r)).collect();
        Ok(Self {
            state: RwLock::new(StoreState {
                next_id: stored.next_id,
                records,
            }),
        })
    }

    /// Write a snapshot of the store to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let path = path.as_ref();
        let stored = {
            let state = self.read()?;
            StoredDocuments {
                next_id: state.next_id,
                records: state.records.values().cloned().collect(),
            }
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Write then rename so a crash never leaves a half-written store.
        let tmp_path = path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            bincode::serialize_into(&mut writer, &stored)?;
            writer.flush()?;
        }
        std::fs::rename(&tmp_path, path)?;

        debug!("Saved {} documents to {}", stored.records.len(), path.display());
        Ok(())
    }

    /// Add a new document without an embedding and return its identifier
    pub fn insert(&self, name: impl Into<String>, text: impl Into<String>) -> StoreResult<DocumentId> {
        let mut state = self.write()?;
        state.next_id += 1;
        let id = DocumentId::new(state.next_id);
        state.records.insert(id, DocumentRecord::new(id, name, text));
        debug!("Inserted document {}", id);
        Ok(id)
    }

    /// Insert or replace a record under its own identifier
    pub fn put(&self, record: DocumentRecord) -> StoreResult<()> {
        let mut state = self.write()?;
        state.next_id = state.next_id.max(record.id.as_u64());
        state.records.insert(record.id, record);
        Ok(())
    }

    pub fn get(&self, id: DocumentId) -> StoreResult<Option<DocumentRecord>> {
        Ok(self.read()?.records.get(&id).cloned())
    }

    /// Store the encoded embedding for a document
    pub fn set_vector(&self, id: DocumentId, vector: &[f32]) -> StoreResult<()> {
        let mut state = self.write()?;
        let record = state.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.vector = Some(encode_vector(vector));
        Ok(())
    }

    /// Remove a document, keeping the order of the rest
    pub fn remove(&self, id: DocumentId) -> StoreResult<DocumentRecord> {
        let mut state = self.write()?;
        let record = state.records.shift_remove(&id).ok_or(StoreError::NotFound(id))?;
        debug!("Removed document {}", id);
        Ok(record)
    }

    /// Consistent copy of every record, in insertion order
    pub fn snapshot(&self) -> StoreResult<Vec<DocumentRecord>> {
        Ok(self.read()?.records.values().cloned().collect())
    }

    /// Identifiers of documents that have no embedding yet
    pub fn pending(&self) -> StoreResult<Vec<DocumentId>> {
        Ok(self
            .read()?
            .records
            .values()
            .filter(|r| !r.has_vector())
            .map(|r| r.id)
            .collect())
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.records.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }
}
