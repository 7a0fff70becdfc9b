//! The `servers` collection: registered storage nodes and node selection.

use chrono::Utc;
use rand::seq::SliceRandom as _;
use rand::{CryptoRng, Rng};
use shardvault_types::records::{NodeRecord, NodeStatus};

use super::database::{Collection, DbError};

/// Handle to the node registry.
#[derive(Clone)]
pub struct NodeRegistry {
    collection: Collection,
}

impl NodeRegistry {
    /// Wraps the `servers` collection.
    pub fn new(collection: Collection) -> Self {
        NodeRegistry { collection }
    }

    /// Inserts a fresh node record, failing on id collision.
    pub fn insert(&self, id: &str, address: String, public_key: shardvault_core::curve::Point) -> Result<(), DbError> {
        let record = NodeRecord {
            id: id.to_owned(),
            address,
            public_key,
            status: NodeStatus::Active,
            last_heartbeat: Utc::now().timestamp_millis(),
        };
        self.collection.insert_unique(id, &record)
    }

    /// Updates a node's address (re-registration after restart).
    pub fn update_address(&self, id: &str, address: String) -> Result<bool, DbError> {
        self.collection.update::<NodeRecord>(id, |record| {
            record.address = address;
            record.last_heartbeat = Utc::now().timestamp_millis();
        })
    }

    /// All registered nodes.
    pub fn all(&self) -> Result<Vec<NodeRecord>, DbError> {
        self.collection.scan()
    }

    /// All nodes currently marked active.
    pub fn active(&self) -> Result<Vec<NodeRecord>, DbError> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|node| node.status == NodeStatus::Active)
            .collect())
    }

    /// Picks `count` distinct active nodes uniformly at random. Returns
    /// `None` when fewer than `count` are active.
    pub fn sample_active<R: Rng + CryptoRng>(
        &self,
        rng: &mut R,
        count: usize,
    ) -> Result<Option<Vec<NodeRecord>>, DbError> {
        let mut active = self.active()?;
        if active.len() < count {
            return Ok(None);
        }
        active.shuffle(rng);
        active.truncate(count);
        Ok(Some(active))
    }
}
