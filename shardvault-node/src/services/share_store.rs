//! The node-local share collection.
//!
//! One sled tree named `enc_shares_{node_id}` holding one
//! [`EncryptedShareRecord`] per file id. Intake is at-most-once: a second
//! share for the same file is rejected and the stored one left untouched.

use shardvault_types::records::EncryptedShareRecord;

/// Errors of the share store.
#[derive(Debug, thiserror::Error)]
pub enum ShareStoreError {
    /// A share for this file id is already stored.
    #[error("share for file {0} already stored")]
    Duplicate(String),
    /// Underlying database failure.
    #[error(transparent)]
    Db(#[from] sled::Error),
    /// A stored document could not be (de)serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Handle to the node's share collection.
#[derive(Clone)]
pub struct ShareStore {
    tree: sled::Tree,
}

impl ShareStore {
    /// Opens (or creates) the `enc_shares_{node_id}` tree.
    pub fn open(db: &sled::Db, node_id: &str) -> Result<Self, ShareStoreError> {
        let tree = db.open_tree(format!("enc_shares_{node_id}"))?;
        Ok(ShareStore { tree })
    }

    /// Stores a share, failing with [`ShareStoreError::Duplicate`] when one
    /// already exists for the file.
    pub fn insert_new(&self, record: &EncryptedShareRecord) -> Result<(), ShareStoreError> {
        let value = serde_json::to_vec(record)?;
        let swapped = self.tree.compare_and_swap(
            record.file_uuid.as_bytes(),
            None::<&[u8]>,
            Some(value),
        )?;
        if swapped.is_err() {
            return Err(ShareStoreError::Duplicate(record.file_uuid.clone()));
        }
        self.tree.flush()?;
        Ok(())
    }

    /// Looks up the share stored for `file_uuid`.
    pub fn get(&self, file_uuid: &str) -> Result<Option<EncryptedShareRecord>, ShareStoreError> {
        match self.tree.get(file_uuid.as_bytes())? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    /// Removes the share for `file_uuid`; returns whether one existed.
    pub fn remove(&self, file_uuid: &str) -> Result<bool, ShareStoreError> {
        let removed = self.tree.remove(file_uuid.as_bytes())?.is_some();
        self.tree.flush()?;
        Ok(removed)
    }
}
