//! The `files` collection, with blob offload for large bodies.
//!
//! Ciphertexts up to [`INLINE_LIMIT`] live inside the file document; larger
//! ones are written to the blob directory and referenced by `grid_ref`.

use std::path::PathBuf;

use shardvault_types::records::FileRecord;

use super::database::{Collection, DbError};

/// Largest body kept inline in the file document (10 MiB of base64).
pub const INLINE_LIMIT: usize = 10 * 1024 * 1024;

/// Errors of the file store.
#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    /// A file with this id already exists.
    #[error("file {0} already exists")]
    Duplicate(String),
    /// Underlying document store failure.
    #[error(transparent)]
    Db(DbError),
    /// Blob directory failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The record references a blob that is gone.
    #[error("file {0} has neither an inline body nor a readable blob")]
    MissingBody(String),
}

impl From<DbError> for FileStoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Duplicate(key) => FileStoreError::Duplicate(key),
            other => FileStoreError::Db(other),
        }
    }
}

/// Handle to the file store.
#[derive(Clone)]
pub struct FileStore {
    collection: Collection,
    blob_dir: PathBuf,
}

impl FileStore {
    /// Wraps the `files` collection with a blob directory.
    pub fn new(collection: Collection, blob_dir: PathBuf) -> Result<Self, FileStoreError> {
        std::fs::create_dir_all(&blob_dir)?;
        Ok(FileStore {
            collection,
            blob_dir,
        })
    }

    /// Persists a fresh file record, offloading the ciphertext to the blob
    /// store when it exceeds the inline limit.
    pub fn insert_new(
        &self,
        mut record: FileRecord,
        ciphertext: String,
    ) -> Result<(), FileStoreError> {
        if ciphertext.len() > INLINE_LIMIT {
            let blob_name = format!("{}.blob", record.id);
            std::fs::write(self.blob_dir.join(&blob_name), ciphertext.as_bytes())?;
            record.grid_ref = Some(blob_name);
            record.file_ciphertext = None;
        } else {
            record.file_ciphertext = Some(ciphertext);
        }

        let result = self.collection.insert_unique(&record.id, &record);
        if result.is_err() {
            if let Some(blob_name) = &record.grid_ref {
                let _ = std::fs::remove_file(self.blob_dir.join(blob_name));
            }
        }
        Ok(result?)
    }

    /// Looks up a file record.
    pub fn get(&self, id: &str) -> Result<Option<FileRecord>, FileStoreError> {
        Ok(self.collection.get(id)?)
    }

    /// All file records.
    pub fn all(&self) -> Result<Vec<FileRecord>, FileStoreError> {
        Ok(self.collection.scan()?)
    }

    /// Bumps the download counter.
    pub fn bump_download_count(&self, id: &str) -> Result<bool, FileStoreError> {
        Ok(self
            .collection
            .update::<FileRecord>(id, |record| record.download_count += 1)?)
    }

    /// Removes a file record and its blob, if any. Returns whether the
    /// record existed.
    pub fn delete(&self, id: &str) -> Result<bool, FileStoreError> {
        if let Some(record) = self.get(id)? {
            if let Some(blob_name) = &record.grid_ref {
                let _ = std::fs::remove_file(self.blob_dir.join(blob_name));
            }
        }
        Ok(self.collection.remove(id)?)
    }

    /// Materializes the body ciphertext, inline or from the blob store.
    pub fn load_ciphertext(&self, record: &FileRecord) -> Result<String, FileStoreError> {
        if let Some(inline) = &record.file_ciphertext {
            return Ok(inline.clone());
        }
        let Some(blob_name) = &record.grid_ref else {
            return Err(FileStoreError::MissingBody(record.id.clone()));
        };
        std::fs::read_to_string(self.blob_dir.join(blob_name))
            .map_err(|_| FileStoreError::MissingBody(record.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use shardvault_types::records::FileStatus;

    fn record(id: &str) -> FileRecord {
        FileRecord {
            id: id.into(),
            file_name: "a.bin".into(),
            file_path: "/tmp".into(),
            file_size: 4,
            file_hash: "00".into(),
            file_iv: "11".repeat(16),
            file_ciphertext: None,
            grid_ref: None,
            upload_user: "alice".into(),
            upload_time: 0,
            status: FileStatus::Active,
            commits: BTreeMap::new(),
            download_count: 0,
        }
    }

    #[test]
    fn small_bodies_stay_inline() {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path().join("db")).unwrap();
        let store = FileStore::new(
            Collection::open(&db, "files").unwrap(),
            dir.path().join("blobs"),
        )
        .unwrap();

        store.insert_new(record("F1"), "aGVsbG8=".into()).unwrap();
        let stored = store.get("F1").unwrap().unwrap();
        assert!(stored.grid_ref.is_none());
        assert_eq!(store.load_ciphertext(&stored).unwrap(), "aGVsbG8=");

        assert!(matches!(
            store.insert_new(record("F1"), "x".into()),
            Err(FileStoreError::Duplicate(_))
        ));
    }

    #[test]
    fn large_bodies_are_offloaded_and_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path().join("db")).unwrap();
        let store = FileStore::new(
            Collection::open(&db, "files").unwrap(),
            dir.path().join("blobs"),
        )
        .unwrap();

        let big = "A".repeat(INLINE_LIMIT + 1);
        store.insert_new(record("F2"), big.clone()).unwrap();
        let stored = store.get("F2").unwrap().unwrap();
        assert!(stored.file_ciphertext.is_none());
        assert_eq!(stored.grid_ref.as_deref(), Some("F2.blob"));
        assert_eq!(store.load_ciphertext(&stored).unwrap(), big);

        assert!(store.delete("F2").unwrap());
        assert!(matches!(
            store.load_ciphertext(&stored),
            Err(FileStoreError::MissingBody(_))
        ));
    }
}
