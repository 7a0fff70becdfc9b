//! Key material and registration state under the node's storage directory.
//!
//! Layout: `private.pem`, `public.pem` and `info.json` (the id and address
//! assigned at registration). Keys only ever touch the local filesystem.

use std::path::PathBuf;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
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
    /// `info.json` is present but malformed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// `public.pem` does not match `private.pem`.
    #[error("public key file does not match the private key")]
    KeyMismatch,
}

/// Registration state persisted as `info.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    /// The id assigned by the coordinator.
    pub server_id: String,
    /// The address the node last registered under.
    pub address: String,
}

/// File-based store for a node's long-term material.
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

    /// Writes `info.json`.
    pub fn save_info(&self, info: &NodeInfo) -> Result<(), KeystoreError> {
        let json = serde_json::to_vec_pretty(info)?;
        std::fs::write(self.dir.join("info.json"), json)?;
        Ok(())
    }

    /// Loads `info.json`, if present.
    pub fn load_info(&self) -> Result<Option<NodeInfo>, KeystoreError> {
        let path = self.dir.join("info.json");
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&std::fs::read(path)?)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng as _;
    use rand_chacha::ChaCha12Rng;
    use shardvault_core::curve::{Group, Point};

    fn p192() -> Group {
        let p = BigUint::parse_bytes(b"fffffffffffffffffffffffffffffffeffffffffffffffff", 16)
            .unwrap();
        let a = &p - 3u32;
        let b = BigUint::parse_bytes(b"64210519e59c80e70fa7e9ab72243049feb8deecc146b9b1", 16)
            .unwrap();
        let gx = BigUint::parse_bytes(b"188da80eb03090f67cbf20eb43a18800f4ff0afd82ff1012", 16)
            .unwrap();
        let gy = BigUint::parse_bytes(b"07192b95ffc8da78631011ed6b24cdd573f977a11e794811", 16)
            .unwrap();
        let order = BigUint::parse_bytes(b"ffffffffffffffffffffffff99def836146bc9b1b4d22831", 16)
            .unwrap();
        Group::new(Curve::new(p, a, b), Point::affine(gx, gy), order)
    }

    #[test]
    fn keypair_and_info_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = Keystore::open(dir.path().to_path_buf()).unwrap();
        let group = p192();
        let mut rng = ChaCha12Rng::seed_from_u64(51);
        let (sk, pk) = group.generate_keypair(&mut rng);

        assert!(
            store
                .load_keypair(&group.curve, |d| group.mul_generator(d))
                .unwrap()
                .is_none()
        );
        store.save_keypair(&sk, &pk, &group.curve).unwrap();
        let (loaded_sk, loaded_pk) = store
            .load_keypair(&group.curve, |d| group.mul_generator(d))
            .unwrap()
            .unwrap();
        assert_eq!(loaded_sk, sk);
        assert_eq!(loaded_pk, pk);

        let info = NodeInfo {
            server_id: "AB".into(),
            address: "http://127.0.0.1:9101".into(),
        };
        store.save_info(&info).unwrap();
        assert_eq!(store.load_info().unwrap().unwrap().server_id, "AB");
    }
}
