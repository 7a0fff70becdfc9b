//! Request and response payloads of the version 1 HTTP API.
//!
//! Field names are the wire contract; ids travel as uppercase hex strings,
//! ciphertexts as base64 blobs, points and signatures in the canonical
//! encodings of `shardvault-core`.

use std::collections::BTreeMap;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use shardvault_core::curve::Point;
use shardvault_core::sm2::Signature;

/// `POST /server/register` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerRegisterRequest {
    /// Base URL the node is reachable at (e.g. `http://10.0.0.7:9101`).
    pub address: String,
    /// The node's long-term ECC public key.
    pub public_key: Point,
}

/// `POST /server/register` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerRegisterResponse {
    /// The assigned node id (32 uppercase hex chars).
    pub server_id: String,
}

/// `POST /server/update_info` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerUpdateRequest {
    /// The node id assigned at registration.
    pub sid: String,
    /// The node's current base URL.
    pub address: String,
}

/// `POST /user/register` request. The password field carries the SHA-256
/// hex digest of the password, never the password itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegisterRequest {
    /// Requested username.
    pub username: String,
    /// SHA-256 hex digest of the password. Redacted in `Debug` output.
    #[serde(serialize_with = "crate::api::secret::expose")]
    pub password: SecretString,
}

/// `POST /user/register` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegisterResponse {
    /// The assigned user id.
    pub user_id: String,
}

/// `POST /user/login` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLoginRequest {
    /// Username.
    pub username: String,
    /// SHA-256 hex digest of the password. Redacted in `Debug` output.
    #[serde(serialize_with = "crate::api::secret::expose")]
    pub password: SecretString,
}

/// `POST /user/login` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLoginResponse {
    /// The user id.
    pub user_id: String,
    /// The stored ECC public key, if the user uploaded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<Point>,
    /// The stored avatar (base64), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// `POST /user/public_key` request. The key is uploaded in PEM form and
/// converted to a curve point by the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublicKeyRequest {
    /// Username (for logging only; the id is authoritative).
    pub username: String,
    /// The user id returned at registration.
    pub user_id: String,
    /// PEM-armored public key.
    pub public_key: String,
}

/// `POST /user/avatar` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarUploadRequest {
    /// The user id.
    pub user_id: String,
    /// Base64-encoded avatar image.
    pub avatar: String,
}

/// `POST /file/upload` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUploadRequest {
    /// File name (without directory).
    pub file_name: String,
    /// Directory part of the original path; feeds the file id.
    pub file_path: String,
    /// Plaintext size in bytes.
    pub file_size: u64,
    /// Base64 AES-CBC ciphertext of the body.
    pub file_ciphertext: String,
    /// Hex IV the body was encrypted under.
    pub file_iv: String,
    /// Uppercase SHA-256 hex digest of the plaintext.
    pub file_hash: String,
    /// The AES key to be threshold-protected (32 hex chars).
    pub file_key: String,
    /// Username of the uploader.
    pub upload_user: String,
}

/// `POST /file/upload` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUploadResponse {
    /// Deterministic file id.
    pub file_uuid: String,
}

/// `POST /file/download` request (client → coordinator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDownloadRequest {
    /// The file id.
    pub file_uuid: String,
    /// Username of the downloader; the coordinator resolves the public key.
    pub download_user: String,
}

/// One node's contribution to a download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncShareEntry {
    /// The responding node's id.
    pub server_id: String,
    /// The share, re-encrypted solely under the downloader's key.
    pub enc_share: String,
}

/// `POST /file/download` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDownloadResponse {
    /// Successful per-node responses; may be shorter than `t` when nodes
    /// failed, in which case reconstruction is up to the caller.
    pub enc_shares_list: Vec<EncShareEntry>,
}

/// `GET /file/detail` query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDetailQuery {
    /// The file id.
    pub file_uuid: String,
}

/// `GET /file/detail` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDetailResponse {
    /// The file id.
    pub file_uuid: String,
    /// File name.
    pub file_name: String,
    /// Plaintext size in bytes.
    pub file_size: u64,
    /// Uppercase SHA-256 hex digest of the plaintext.
    pub file_hash: String,
    /// Hex IV of the body ciphertext.
    pub file_iv: String,
    /// Base64 AES ciphertext of the body.
    pub file_ciphertext: String,
    /// Times the detail endpoint served this file.
    pub download_count: u64,
    /// Feldman commitments `i → Cᵢ`.
    pub commits: BTreeMap<u32, Point>,
}

/// `GET /file/list` query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileListQuery {
    /// Restrict the listing to files uploaded by this user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// One row of `GET /file/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSummary {
    /// The file id.
    pub file_uuid: String,
    /// File name.
    pub file_name: String,
    /// Plaintext size in bytes.
    pub file_size: u64,
    /// Uppercase SHA-256 hex digest of the plaintext.
    pub file_hash: String,
    /// Username of the uploader.
    pub upload_user: String,
    /// Upload timestamp, milliseconds since the epoch.
    pub upload_time: i64,
    /// Lifecycle status (`active`, `deleted`, `expired`).
    pub status: String,
    /// Times the file was downloaded.
    pub download_count: u64,
}

/// `GET /file/list` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileListResponse {
    /// File summaries.
    pub files_info: Vec<FileSummary>,
}

/// `POST /file/delete` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDeleteRequest {
    /// The file id.
    pub file_uuid: String,
    /// Username of the caller; must match the uploader.
    pub username: String,
}

/// `POST /sign_cryption` request (coordinator → node).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignCryptionRequest {
    /// The receiving node's id; its share was encrypted under its key.
    pub server_id: String,
    /// The file the share belongs to.
    pub file_uuid: String,
    /// ECC ciphertext of the share, encrypted under the node's key.
    pub ciphertext: String,
    /// Coordinator SM2 signature over `ciphertext`.
    pub signature: Signature,
}

/// The downloader identity a node re-encrypts for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadUser {
    /// The downloader's user id.
    #[serde(rename = "_id")]
    pub user_id: String,
    /// The downloader's ECC public key.
    pub public_key: Point,
}

/// `POST /download_request` request (coordinator → node).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadShareRequest {
    /// The file id.
    pub file_uuid: String,
    /// The downloader the share shall be re-encrypted for.
    pub download_user: DownloadUser,
}

/// `POST /download_request` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadShareResponse {
    /// The node's id.
    pub server_id: String,
    /// The share ciphertext, now only under the downloader's key.
    pub enc_share: String,
}

/// `POST /delete_request` request (coordinator → node).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareDeleteRequest {
    /// The file whose share shall be removed.
    pub file_uuid: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    #[test]
    fn signcryption_request_wire_shape() {
        let req = SignCryptionRequest {
            server_id: "AB12".into(),
            file_uuid: "F00D".into(),
            ciphertext: "aGVsbG8=".into(),
            signature: Signature {
                r: BigUint::from(5u32),
                s: BigUint::from(9u32),
            },
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json["signature"].is_array());
        let back: SignCryptionRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back.signature.s, BigUint::from(9u32));
    }

    #[test]
    fn commits_map_uses_string_keys() {
        let detail = FileDetailResponse {
            file_uuid: "F".into(),
            file_name: "a.txt".into(),
            file_size: 1,
            file_hash: "00".into(),
            file_iv: "00".repeat(16),
            file_ciphertext: String::new(),
            download_count: 0,
            commits: BTreeMap::from([(0, Point::Infinity)]),
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert!(json["commits"].get("0").is_some());
    }
}
