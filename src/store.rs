//! Storage collaborator for File Records.
//!
//! The query pipeline and the import reconciler only see this trait; the
//! registry binary plugs in [`crate::sqlite::SqliteStore`], tests use
//! [`MemoryStore`].

use crate::record::{FileKey, FileRecord};
use anyhow::Result;

/// Persistent storage of File Records keyed by a surrogate id.
///
/// Writes go through [`FileRecord::sanitized`], so unnamed sub-files never
/// reach storage. Writes with a blank `file_no` are rejected.
pub trait FileStore {
    /// Find one record whose natural key equals `key` (null-aware on `file_name`).
    fn find_by_key(&self, key: &FileKey) -> Result<Option<FileRecord>>;

    /// Insert a new record and return its id. Any id on `record` is ignored.
    fn insert(&mut self, record: &FileRecord) -> Result<i64>;

    fn get(&self, id: i64) -> Result<Option<FileRecord>>;

    /// All records in id order.
    fn list(&self) -> Result<Vec<FileRecord>>;

    /// Replace every field of record `id`, sub-files included.
    fn update(&mut self, id: i64, record: &FileRecord) -> Result<()>;

    fn delete(&mut self, id: i64) -> Result<()>;
}

/// Reject records that cannot be stored.
pub(crate) fn prepare_for_write(record: &FileRecord) -> Result<FileRecord> {
    let record = record.clone().sanitized();
    if record.file_no.is_empty() {
        return Err(anyhow::anyhow!("file_no is required"));
    }
    Ok(record)
}

/// In-process store backed by a `Vec`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<FileRecord>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `records`, assigning fresh ids.
    pub fn with_records(records: impl IntoIterator<Item = FileRecord>) -> Result<Self> {
        let mut store = Self::new();
        for record in records {
            store.insert(&record)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn position(&self, id: i64) -> Option<usize> {
        self.records.iter().position(|r| r.id == Some(id))
    }
}

impl FileStore for MemoryStore {
    fn find_by_key(&self, key: &FileKey) -> Result<Option<FileRecord>> {
        Ok(self.records.iter().find(|r| key.matches(r)).cloned())
    }

    fn insert(&mut self, record: &FileRecord) -> Result<i64> {
        let mut record = prepare_for_write(record)?;
        self.next_id += 1;
        record.id = Some(self.next_id);
        log::debug!("Inserted file_no {} as id {}", record.file_no, self.next_id);
        self.records.push(record);
        Ok(self.next_id)
    }

    fn get(&self, id: i64) -> Result<Option<FileRecord>> {
        Ok(self.position(id).map(|i| self.records[i].clone()))
    }

    fn list(&self) -> Result<Vec<FileRecord>> {
        Ok(self.records.clone())
    }

    fn update(&mut self, id: i64, record: &FileRecord) -> Result<()> {
        let idx = self
            .position(id)
            .ok_or_else(|| anyhow::anyhow!("File id {} not found", id))?;
        let mut record = prepare_for_write(record)?;
        record.id = Some(id);
        self.records[idx] = record;
        Ok(())
    }

    fn delete(&mut self, id: i64) -> Result<()> {
        let idx = self
            .position(id)
            .ok_or_else(|| anyhow::anyhow!("File id {} not found", id))?;
        self.records.remove(idx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SubFile;

    #[test]
    fn test_memory_store_crud() {
        let mut store = MemoryStore::new();
        let id = store.insert(&FileRecord::new("A1", "Roof Plan")).unwrap();
        let second = store.insert(&FileRecord::new("A2", "")).unwrap();
        assert_eq!((id, second), (1, 2));
        assert_eq!(store.len(), 2);

        let mut edited = store.get(id).unwrap().unwrap();
        edited.remark = "revised".to_string();
        edited.sub_files = vec![SubFile::named("Detail"), SubFile::named(" ")];
        store.update(id, &edited).unwrap();

        let fetched = store.get(id).unwrap().unwrap();
        assert_eq!(fetched.remark, "revised");
        assert_eq!(fetched.sub_files, vec![SubFile::named("Detail")]);

        store.delete(second).unwrap();
        assert!(store.get(second).unwrap().is_none());
        assert!(store.delete(second).is_err());
        assert!(store.update(99, &edited).is_err());
    }

    #[test]
    fn test_memory_store_find_by_key() {
        let store = MemoryStore::with_records([
            FileRecord::new("A", "X"),
            FileRecord::new("B", ""),
        ])
        .unwrap();

        assert!(store.find_by_key(&FileKey::new("A", Some("X"))).unwrap().is_some());
        assert!(store.find_by_key(&FileKey::new("A", None)).unwrap().is_none());
        assert!(store.find_by_key(&FileKey::new("B", None)).unwrap().is_some());
        assert!(store.find_by_key(&FileKey::new("B", Some("X"))).unwrap().is_none());
    }

    #[test]
    fn test_blank_file_no_rejected() {
        let mut store = MemoryStore::new();
        let err = store.insert(&FileRecord::new("  ", "Nameless")).unwrap_err();
        assert!(err.to_string().contains("file_no is required"));
        assert!(store.is_empty());
    }
}
