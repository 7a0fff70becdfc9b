//! Document storage on sled.
//!
//! One [`Collection`] per logical collection (`system_params`, `servers`,
//! `users`, `files`), each a sled tree holding JSON documents keyed by their
//! id. Only document-level atomicity is provided, which is all the handlers
//! rely on.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Errors of the document store.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A document with this key already exists.
    #[error("document {0:?} already exists")]
    Duplicate(String),
    /// Underlying database failure.
    #[error(transparent)]
    Db(#[from] sled::Error),
    /// A stored document could not be (de)serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Handle to one collection.
#[derive(Clone)]
pub struct Collection {
    tree: sled::Tree,
}

impl Collection {
    /// Opens (or creates) the named collection.
    pub fn open(db: &sled::Db, name: &str) -> Result<Self, DbError> {
        Ok(Collection {
            tree: db.open_tree(name)?,
        })
    }

    /// Inserts a document, failing with [`DbError::Duplicate`] when the key
    /// is taken.
    pub fn insert_unique<T: Serialize>(&self, key: &str, doc: &T) -> Result<(), DbError> {
        let value = serde_json::to_vec(doc)?;
        let swapped = self
            .tree
            .compare_and_swap(key.as_bytes(), None::<&[u8]>, Some(value))?;
        if swapped.is_err() {
            return Err(DbError::Duplicate(key.to_owned()));
        }
        self.tree.flush()?;
        Ok(())
    }

    /// Inserts or replaces a document.
    pub fn put<T: Serialize>(&self, key: &str, doc: &T) -> Result<(), DbError> {
        self.tree.insert(key.as_bytes(), serde_json::to_vec(doc)?)?;
        self.tree.flush()?;
        Ok(())
    }

    /// Looks up a document.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DbError> {
        match self.tree.get(key.as_bytes())? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    /// Removes a document; returns whether it existed.
    pub fn remove(&self, key: &str) -> Result<bool, DbError> {
        let removed = self.tree.remove(key.as_bytes())?.is_some();
        self.tree.flush()?;
        Ok(removed)
    }

    /// Reads every document in the collection.
    pub fn scan<T: DeserializeOwned>(&self) -> Result<Vec<T>, DbError> {
        self.tree
            .iter()
            .map(|entry| {
                let (_, raw) = entry?;
                Ok(serde_json::from_slice(&raw)?)
            })
            .collect()
    }

    /// Applies `mutate` to the stored document, if present. Returns whether
    /// a document was updated.
    pub fn update<T: DeserializeOwned + Serialize>(
        &self,
        key: &str,
        mutate: impl FnOnce(&mut T),
    ) -> Result<bool, DbError> {
        let Some(mut doc) = self.get::<T>(key)? else {
            return Ok(false);
        };
        mutate(&mut doc);
        self.put(key, &doc)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Doc {
        name: String,
        count: u32,
    }

    #[test]
    fn unique_insert_and_update() {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let col = Collection::open(&db, "docs").unwrap();

        let doc = Doc {
            name: "a".into(),
            count: 0,
        };
        col.insert_unique("k", &doc).unwrap();
        assert!(matches!(
            col.insert_unique("k", &doc),
            Err(DbError::Duplicate(_))
        ));

        assert!(col.update::<Doc>("k", |d| d.count += 1).unwrap());
        assert_eq!(col.get::<Doc>("k").unwrap().unwrap().count, 1);
        assert!(!col.update::<Doc>("missing", |d| d.count += 1).unwrap());

        assert_eq!(col.scan::<Doc>().unwrap().len(), 1);
        assert!(col.remove("k").unwrap());
        assert!(!col.remove("k").unwrap());
    }
}
