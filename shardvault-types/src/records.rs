//! Documents persisted by the coordinator and the storage nodes.
//!
//! Records are stored as JSON documents keyed by their `_id` field, one
//! collection (sled tree) per record type.

use std::collections::BTreeMap;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use shardvault_core::curve::Point;

/// Lifecycle status of a stored file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Uploaded and downloadable.
    Active,
    /// Deleted by its owner.
    Deleted,
    /// Expired.
    Expired,
}

/// Availability status of a storage node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Accepting shares and download requests.
    Active,
    /// Not reachable.
    Offline,
    /// Temporarily out of rotation.
    Maintenance,
}

/// Account status of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// Normal account.
    Active,
    /// Disabled after a fault.
    Fault,
    /// Deregistered.
    Cancelled,
}

/// Role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Administrative account.
    Admin,
    /// Regular account.
    User,
}

/// One uploaded file, stored in the coordinator's `files` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Deterministic id: `SHA-256(path ∥ content-hash ∥ uploader)`.
    #[serde(rename = "_id")]
    pub id: String,
    /// File name.
    pub file_name: String,
    /// Directory part of the original path.
    pub file_path: String,
    /// Plaintext size in bytes.
    pub file_size: u64,
    /// Uppercase SHA-256 hex digest of the plaintext.
    pub file_hash: String,
    /// Hex IV of the body ciphertext.
    pub file_iv: String,
    /// Base64 AES ciphertext; `None` when offloaded to the blob store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_ciphertext: Option<String>,
    /// Blob-store reference for bodies larger than the inline limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_ref: Option<String>,
    /// Username of the uploader.
    pub upload_user: String,
    /// Upload timestamp, milliseconds since the epoch.
    pub upload_time: i64,
    /// Lifecycle status.
    pub status: FileStatus,
    /// Feldman commitments `i → Cᵢ` for coefficients `0..t`.
    pub commits: BTreeMap<u32, Point>,
    /// Times the file detail was served.
    pub download_count: u64,
}

/// One registered storage node, in the coordinator's `servers` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node id (32 uppercase hex chars).
    #[serde(rename = "_id")]
    pub id: String,
    /// Base URL the node serves on.
    pub address: String,
    /// The node's long-term ECC public key.
    pub public_key: Point,
    /// Availability status.
    pub status: NodeStatus,
    /// Last heartbeat, milliseconds since the epoch.
    pub last_heartbeat: i64,
}

/// One user account, in the coordinator's `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// User id (32 uppercase hex chars).
    #[serde(rename = "_id")]
    pub id: String,
    /// Unique username.
    pub username: String,
    /// SHA-256 hex digest of the password. Redacted in `Debug` output;
    /// exposed explicitly when the record is written to the database.
    #[serde(serialize_with = "crate::api::secret::expose")]
    pub password: SecretString,
    /// The user's ECC public key, once uploaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<Point>,
    /// Account status.
    pub status: UserStatus,
    /// Role.
    pub role: UserRole,
    /// Base64 avatar, if uploaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Creation timestamp, milliseconds since the epoch.
    pub created_at: i64,
    /// Last login timestamp, milliseconds since the epoch.
    pub last_login: i64,
}

/// One stored share, in a node's `enc_shares_{node_id}` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedShareRecord {
    /// The file the share belongs to; at most one share per file per node.
    #[serde(rename = "_id")]
    pub file_uuid: String,
    /// ECC ciphertext of the share under the node's long-term key.
    pub enc_share: String,
    /// The node id the coordinator addressed the share to.
    pub server_id: String,
    /// Intake timestamp, milliseconds since the epoch.
    pub created_at: i64,
    /// Expiry timestamp (30 days after intake).
    pub expires_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&FileStatus::Active).unwrap(),
            "\"active\""
        );
        assert_eq!(
            serde_json::to_string(&NodeStatus::Maintenance).unwrap(),
            "\"maintenance\""
        );
        assert_eq!(
            serde_json::to_string(&UserRole::Admin).unwrap(),
            "\"admin\""
        );
    }

    #[test]
    fn user_record_redacts_password_in_debug_but_persists_it() {
        let hash = "A665A45920422F9D417E4867EFDC4FB8A04A1F3FFF1FA07E998E86F7F7A27AE3";
        let record = UserRecord {
            id: "U1".into(),
            username: "alice".into(),
            password: SecretString::from(hash.to_owned()),
            public_key: None,
            status: UserStatus::Active,
            role: UserRole::User,
            avatar: None,
            created_at: 0,
            last_login: 0,
        };

        let debugged = format!("{record:?}");
        assert!(!debugged.contains(hash), "password hash leaked: {debugged}");

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["password"], hash);
        let back: UserRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.username, "alice");
    }

    #[test]
    fn file_record_round_trip() {
        let record = FileRecord {
            id: "AB".into(),
            file_name: "a.txt".into(),
            file_path: "/tmp".into(),
            file_size: 11,
            file_hash: "00".into(),
            file_iv: "11".repeat(16),
            file_ciphertext: Some("aGVsbG8=".into()),
            grid_ref: None,
            upload_user: "alice".into(),
            upload_time: 1_700_000_000_000,
            status: FileStatus::Active,
            commits: BTreeMap::new(),
            download_count: 0,
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: FileRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "AB");
        assert_eq!(back.status, FileStatus::Active);
    }
}
