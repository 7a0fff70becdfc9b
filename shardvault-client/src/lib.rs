#![deny(missing_docs, clippy::unwrap_used)]
//! Client library for the shardvault threshold file-storage system.
//!
//! A [`ShardVaultClient`] drives the coordinator for account and file
//! operations and performs the cryptographic client side of the protocol:
//! AES-encrypting file bodies under a fresh random key at upload, and at
//! download decrypting the collected shares, verifying each against the
//! Feldman commitments, Lagrange-interpolating the coefficient set and
//! reassembling the key through the mask in `a₀`.
//!
//! The reconstruction path is exposed separately as [`reconstruct_key`] so
//! callers can feed it share lists they obtained (or filtered) themselves.

use num_bigint::BigUint;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shardvault_core::curve::Point;
use shardvault_core::dealing;
use shardvault_core::ecies::Ecies;
use shardvault_core::poly::Polynomial;
use shardvault_core::{codec, filecipher, keys, sha256_hex};
use shardvault_types::api::v1::{
    EncShareEntry, FileDeleteRequest, FileDetailResponse, FileDownloadRequest,
    FileDownloadResponse, FileListResponse, FileSummary, FileUploadRequest, FileUploadResponse,
    UserLoginRequest, UserLoginResponse, UserPublicKeyRequest, UserRegisterRequest,
    UserRegisterResponse,
};
use shardvault_types::api::{ApiFailure, ApiResponse};
use shardvault_types::params::SystemParameters;

/// Width of file keys in hex characters (AES-128).
pub const KEY_WIDTH: usize = 32;

/// Errors of the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport failure talking to the coordinator.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// The coordinator (or a node, relayed) returned an error envelope.
    #[error(transparent)]
    Api(#[from] ApiFailure),
    /// A success envelope arrived without the expected payload.
    #[error("peer returned an empty payload")]
    EmptyPayload,
    /// The operation needs a logged-in user.
    #[error("not logged in")]
    NotLoggedIn,
    /// The operation needs a local ECC keypair.
    #[error("no local keypair; call ensure_keypair first")]
    NoKeypair,
    /// Fewer than `t` shares survived decryption and commitment checks.
    #[error("reconstruction failed: {verified} verified shares, {required} required")]
    ReconstructionFailed {
        /// Shares that decrypted and verified.
        verified: usize,
        /// The threshold `t`.
        required: usize,
    },
    /// The decrypted body does not match the recorded content hash.
    #[error("integrity violation: decrypted body does not match the recorded hash")]
    IntegrityViolation,
    /// A cryptographic step failed.
    #[error("crypto failure: {0}")]
    Crypto(String),
}

/// A downloaded and decrypted file.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    /// The stored file name.
    pub file_name: String,
    /// The decrypted body.
    pub data: Vec<u8>,
}

struct Identity {
    username: String,
    user_id: String,
}

/// Client handle bound to one coordinator.
pub struct ShardVaultClient {
    http: reqwest::Client,
    coordinator_url: String,
    params: SystemParameters,
    identity: Option<Identity>,
    keypair: Option<(BigUint, Point)>,
}

impl ShardVaultClient {
    /// Connects to a coordinator and fetches the system parameters.
    pub async fn connect(coordinator_url: impl Into<String>) -> Result<Self, ClientError> {
        let coordinator_url = coordinator_url.into();
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        let params: SystemParameters = require_payload(
            http.get(format!(
                "{}/system/parameters",
                coordinator_url.trim_end_matches('/')
            ))
            .send()
            .await?
            .json::<ApiResponse<SystemParameters>>()
            .await?,
        )?;
        tracing::debug!("connected, curve {}, t={} n={}", params.curve, params.t, params.n);
        Ok(ShardVaultClient {
            http,
            coordinator_url,
            params,
            identity: None,
            keypair: None,
        })
    }

    /// The system parameters this client operates under.
    pub fn params(&self) -> &SystemParameters {
        &self.params
    }

    /// The local keypair, if one was generated.
    pub fn keypair(&self) -> Option<&(BigUint, Point)> {
        self.keypair.as_ref()
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<Option<R>, ClientError> {
        let envelope: ApiResponse<R> = self
            .http
            .post(format!(
                "{}/{endpoint}",
                self.coordinator_url.trim_end_matches('/')
            ))
            .json(body)
            .send()
            .await?
            .json()
            .await?;
        Ok(envelope.into_result()?)
    }

    async fn get<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<R>, ClientError> {
        let envelope: ApiResponse<R> = self
            .http
            .get(format!(
                "{}/{endpoint}",
                self.coordinator_url.trim_end_matches('/')
            ))
            .query(query)
            .send()
            .await?
            .json()
            .await?;
        Ok(envelope.into_result()?)
    }

    /// Registers an account. The password is hashed before it leaves the
    /// client.
    pub async fn register(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<String, ClientError> {
        let response: UserRegisterResponse = self
            .post(
                "user/register",
                &UserRegisterRequest {
                    username: username.to_owned(),
                    password: sha256_hex(password.as_bytes()).into(),
                },
            )
            .await?
            .ok_or(ClientError::EmptyPayload)?;
        self.identity = Some(Identity {
            username: username.to_owned(),
            user_id: response.user_id.clone(),
        });
        Ok(response.user_id)
    }

    /// Logs into an existing account.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<String, ClientError> {
        let response: UserLoginResponse = self
            .post(
                "user/login",
                &UserLoginRequest {
                    username: username.to_owned(),
                    password: sha256_hex(password.as_bytes()).into(),
                },
            )
            .await?
            .ok_or(ClientError::EmptyPayload)?;
        self.identity = Some(Identity {
            username: username.to_owned(),
            user_id: response.user_id.clone(),
        });
        Ok(response.user_id)
    }

    /// Generates a local ECC keypair (if none exists) and uploads the public
    /// key in PEM form. Required before downloading.
    pub async fn ensure_keypair(&mut self) -> Result<(), ClientError> {
        let identity = self.identity.as_ref().ok_or(ClientError::NotLoggedIn)?;
        if self.keypair.is_none() {
            let group = self.params.group();
            let mut rng = rand::thread_rng();
            self.keypair = Some(group.generate_keypair(&mut rng));
        }
        let (_, public_key) = self.keypair.as_ref().ok_or(ClientError::NoKeypair)?;
        let pem = keys::public_key_to_pem(public_key, &self.params.curve())
            .map_err(|e| ClientError::Crypto(e.to_string()))?;

        let request = UserPublicKeyRequest {
            username: identity.username.clone(),
            user_id: identity.user_id.clone(),
            public_key: pem,
        };
        self.post::<_, serde_json::Value>("user/public_key", &request)
            .await?;
        Ok(())
    }

    /// Encrypts and uploads a file body; returns the assigned file id.
    ///
    /// A fresh random key and IV are drawn per upload; the key is handed to
    /// the coordinator for threshold protection and then forgotten.
    pub async fn upload(
        &self,
        file_name: &str,
        file_path: &str,
        data: &[u8],
    ) -> Result<String, ClientError> {
        let identity = self.identity.as_ref().ok_or(ClientError::NotLoggedIn)?;

        let (key, iv) = {
            let mut rng = rand::thread_rng();
            (
                filecipher::random_key_hex(&mut rng),
                filecipher::random_iv_hex(&mut rng),
            )
        };
        let ciphertext = filecipher::encrypt(&key, &iv, data)
            .map_err(|e| ClientError::Crypto(e.to_string()))?;

        let request = FileUploadRequest {
            file_name: file_name.to_owned(),
            file_path: file_path.to_owned(),
            file_size: data.len() as u64,
            file_ciphertext: ciphertext,
            file_iv: iv,
            file_hash: sha256_hex(data),
            file_key: key,
            upload_user: identity.username.clone(),
        };
        let response: FileUploadResponse = self
            .post("file/upload", &request)
            .await?
            .ok_or(ClientError::EmptyPayload)?;
        tracing::info!("uploaded {} as {}", file_name, response.file_uuid);
        Ok(response.file_uuid)
    }

    /// Fetches the detail document of a file.
    pub async fn file_detail(&self, file_uuid: &str) -> Result<FileDetailResponse, ClientError> {
        self.get("file/detail", &[("file_uuid", file_uuid)])
            .await?
            .ok_or(ClientError::EmptyPayload)
    }

    /// Requests re-encrypted shares for a file from the coordinator.
    pub async fn collect_shares(&self, file_uuid: &str) -> Result<Vec<EncShareEntry>, ClientError> {
        let identity = self.identity.as_ref().ok_or(ClientError::NotLoggedIn)?;
        let response: FileDownloadResponse = self
            .post(
                "file/download",
                &FileDownloadRequest {
                    file_uuid: file_uuid.to_owned(),
                    download_user: identity.username.clone(),
                },
            )
            .await?
            .ok_or(ClientError::EmptyPayload)?;
        Ok(response.enc_shares_list)
    }

    /// Downloads and decrypts a file: detail, shares, key reconstruction,
    /// AES decryption, content-hash verification.
    pub async fn download(&self, file_uuid: &str) -> Result<DownloadedFile, ClientError> {
        let (private_key, _) = self.keypair.as_ref().ok_or(ClientError::NoKeypair)?;

        let detail = self.file_detail(file_uuid).await?;
        let shares = self.collect_shares(file_uuid).await?;
        let key = reconstruct_key(&self.params, &detail.commits, &shares, private_key)?;

        let data = filecipher::decrypt(&key, &detail.file_iv, &detail.file_ciphertext)
            .map_err(|e| ClientError::Crypto(e.to_string()))?;
        if sha256_hex(&data) != detail.file_hash {
            return Err(ClientError::IntegrityViolation);
        }
        Ok(DownloadedFile {
            file_name: detail.file_name,
            data,
        })
    }

    /// Lists stored files, optionally restricted to one uploader.
    pub async fn list_files(
        &self,
        username: Option<&str>,
    ) -> Result<Vec<FileSummary>, ClientError> {
        let query: Vec<(&str, &str)> = match username {
            Some(name) => vec![("username", name)],
            None => Vec::new(),
        };
        let response: FileListResponse = self
            .get("file/list", &query)
            .await?
            .ok_or(ClientError::EmptyPayload)?;
        Ok(response.files_info)
    }

    /// Deletes an owned file; the coordinator cascades to the nodes.
    pub async fn delete(&self, file_uuid: &str) -> Result<(), ClientError> {
        let identity = self.identity.as_ref().ok_or(ClientError::NotLoggedIn)?;
        self.post::<_, serde_json::Value>(
            "file/delete",
            &FileDeleteRequest {
                file_uuid: file_uuid.to_owned(),
                username: identity.username.clone(),
            },
        )
        .await?;
        Ok(())
    }
}

fn require_payload<T>(envelope: ApiResponse<T>) -> Result<T, ClientError> {
    envelope.into_result()?.ok_or(ClientError::EmptyPayload)
}

/// Reconstructs the file key from re-encrypted shares.
///
/// Each share is decrypted with `private_key`, checked against the Feldman
/// commitments (`s·G == Σ idⁱ·Cᵢ`) and discarded on mismatch. Once `t`
/// distinct shares verify, the full coefficient set is Lagrange-interpolated
/// and the key reassembled via the mask in `a₀`. Share order is irrelevant.
pub fn reconstruct_key(
    params: &SystemParameters,
    commits: &std::collections::BTreeMap<u32, Point>,
    shares: &[EncShareEntry],
    private_key: &BigUint,
) -> Result<String, ClientError> {
    let group = params.group();
    let ecies = Ecies::new(group.clone());
    let required = params.t as usize;

    let mut points: Vec<(BigUint, BigUint)> = Vec::with_capacity(required);
    for entry in shares {
        let Ok(node_id) = codec::hex_to_int(&entry.server_id) else {
            tracing::warn!("share from {} has a malformed id", entry.server_id);
            continue;
        };
        if points.iter().any(|(id, _)| id == &node_id) {
            continue;
        }

        let share = match ecies.decrypt(&entry.enc_share, private_key) {
            Ok(plaintext) => match std::str::from_utf8(&plaintext)
                .map_err(|e| e.to_string())
                .and_then(|text| codec::hex_to_int(text).map_err(|e| e.to_string()))
            {
                Ok(share) => share,
                Err(err) => {
                    tracing::warn!("share from {} is malformed: {err}", entry.server_id);
                    continue;
                }
            },
            Err(err) => {
                tracing::warn!("share from {} failed to decrypt: {err}", entry.server_id);
                continue;
            }
        };

        if !dealing::verify_share(&group, commits, &node_id, &share) {
            tracing::warn!("share from {} failed the commitment check", entry.server_id);
            continue;
        }
        points.push((node_id, share));
        if points.len() == required {
            break;
        }
    }

    if points.len() < required {
        return Err(ClientError::ReconstructionFailed {
            verified: points.len(),
            required,
        });
    }

    let coefficients = Polynomial::lagrange_coefficients(&points, &group.order)
        .map_err(|e| ClientError::Crypto(e.to_string()))?;
    dealing::recover_key(&coefficients, params.t, KEY_WIDTH)
        .map_err(|e| ClientError::Crypto(e.to_string()))
}
