//! PEM persistence of the coordinator's SM2 keypair.

use std::path::PathBuf;

use num_bigint::BigUint;
use shardvault_core::curve::{Curve, Point};
use shardvault_core::keys;

/// Errors of the keystore.
#[derive(Debug, thiserror::Error)]
pub enum KeystoreError {
    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A key file is present but malformed.
    #[error(transparent)]
    Pem(#[from] keys::PemError),
    /// `public.pem` does not match `private.pem`.
    #[error("public key file does not match the private key")]
    KeyMismatch,
}

/// File-based store for the coordinator's long-term material.
#[derive(Debug, Clone)]
pub struct Keystore {
    dir: PathBuf,
}

impl Keystore {
    /// Opens the store, creating the directory if needed.
    pub fn open(dir: PathBuf) -> Result<Self, KeystoreError> {
        std::fs::create_dir_all(&dir)?;
        Ok(Keystore { dir })
    }

    /// Writes `private.pem` and `public.pem`.
    pub fn save_keypair(
        &self,
        private_key: &BigUint,
        public_key: &Point,
        curve: &Curve,
    ) -> Result<(), KeystoreError> {
        std::fs::write(
            self.dir.join("private.pem"),
            keys::private_key_to_pem(private_key, curve),
        )?;
        std::fs::write(
            self.dir.join("public.pem"),
            keys::public_key_to_pem(public_key, curve)?,
        )?;
        Ok(())
    }

    /// Loads the keypair, if present, verifying the public file against the
    /// private scalar.
    pub fn load_keypair(
        &self,
        curve: &Curve,
        expected_public: impl Fn(&BigUint) -> Point,
    ) -> Result<Option<(BigUint, Point)>, KeystoreError> {
        let private_path = self.dir.join("private.pem");
        if !private_path.exists() {
            return Ok(None);
        }
        let private_key = keys::pem_to_private_key(&std::fs::read_to_string(private_path)?)?;
        let public_key =
            keys::pem_to_public_key(&std::fs::read_to_string(self.dir.join("public.pem"))?, curve)?;
        if expected_public(&private_key) != public_key {
            return Err(KeystoreError::KeyMismatch);
        }
        Ok(Some((private_key, public_key)))
    }
}
