//! Layered ECC encryption over Koblitz-encoded plaintexts.
//!
//! A ciphertext carries one helper point per encryption layer (`c1 = r·G`,
//! `c2 = r'·G`, …) and a list of point ciphertexts `cts`, where each layer
//! added `r·P` to every entry. Because point addition is abelian, layers can
//! be stripped independently and in any order with the matching private key:
//! this is what lets a storage node re-encrypt a stored share to the
//! downloader without ever holding the plaintext.
//!
//! The serialized form is base64 over the JSON object
//! `{"c1": [x, y], …, "cts": [[x, y], …]}` with coordinates in the canonical
//! grouped-hex encoding.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use num_bigint::BigUint;
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};

use crate::curve::{Group, Point};
use crate::koblitz::{KoblitzCodec, KoblitzError};

/// Errors of layered encryption and decryption.
#[derive(Debug, thiserror::Error)]
pub enum EciesError {
    /// The armored ciphertext is not valid base64/JSON.
    #[error("malformed ciphertext: {0}")]
    Malformed(String),
    /// A final decryption was attempted on a ciphertext that still carries
    /// more than one layer.
    #[error("ciphertext carries {0} layers, expected exactly one")]
    LayeredCiphertext(usize),
    /// The helper point addressed by a layer label does not exist.
    #[error("no encryption layer labelled {0:?}")]
    LayerNotFound(String),
    /// Point encoding or padding failure.
    #[error(transparent)]
    Koblitz(#[from] KoblitzError),
}

/// Wire structure of a (possibly multi-layer) ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CipherBody {
    /// Helper points keyed by their layer label (`c1`, `c2`, …).
    #[serde(flatten)]
    helpers: BTreeMap<String, Point>,
    /// Per-block point ciphertexts.
    cts: Vec<Point>,
}

impl CipherBody {
    fn armor(&self) -> String {
        let json = serde_json::to_vec(self).expect("ciphertext body always serializes");
        BASE64.encode(json)
    }

    fn from_armor(armored: &str) -> Result<Self, EciesError> {
        let raw = BASE64
            .decode(armored.trim())
            .map_err(|e| EciesError::Malformed(e.to_string()))?;
        serde_json::from_slice(&raw).map_err(|e| EciesError::Malformed(e.to_string()))
    }

    /// The label the next layer will use: one past the highest existing one.
    fn next_label(&self) -> String {
        let highest = self
            .helpers
            .keys()
            .filter_map(|k| k.strip_prefix('c')?.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("c{}", highest + 1)
    }
}

/// ECC encryption bound to a fixed group, with Koblitz plaintext embedding.
#[derive(Debug, Clone)]
pub struct Ecies {
    group: Group,
    koblitz: KoblitzCodec,
}

impl Ecies {
    /// Creates the cipher for a group; the Koblitz block size is derived from
    /// the curve prime.
    pub fn new(group: Group) -> Self {
        let koblitz = KoblitzCodec::new(group.curve.clone());
        Ecies { group, koblitz }
    }

    /// Encrypts `plaintext` under `public_key` as a fresh single-layer
    /// ciphertext with helper `c1`.
    ///
    /// # Panics
    /// Panics if `public_key` is not on the curve; callers validate keys at
    /// registration time.
    pub fn encrypt<R: Rng + CryptoRng>(
        &self,
        rng: &mut R,
        plaintext: &[u8],
        public_key: &Point,
    ) -> Result<String, EciesError> {
        assert!(
            self.group.curve.contains(public_key),
            "public key must be on the curve"
        );
        let points = self.koblitz.encode(plaintext)?;
        let r = self.group.random_scalar(rng);
        let shared = self.group.curve.mul(public_key, &r);

        let body = CipherBody {
            helpers: BTreeMap::from([("c1".to_owned(), self.group.mul_generator(&r))]),
            cts: points
                .iter()
                .map(|m| self.group.curve.add(m, &shared))
                .collect(),
        };
        Ok(body.armor())
    }

    /// Decrypts a single-layer ciphertext with `private_key`.
    ///
    /// Fails with [`EciesError::LayeredCiphertext`] when more than one helper
    /// point is present; strip the extra layers first.
    pub fn decrypt(&self, armored: &str, private_key: &BigUint) -> Result<Vec<u8>, EciesError> {
        let body = CipherBody::from_armor(armored)?;
        if body.helpers.len() != 1 {
            return Err(EciesError::LayeredCiphertext(body.helpers.len()));
        }
        let helper = body.helpers.values().next().expect("exactly one helper");
        let shared = self.group.curve.mul(helper, private_key);
        let points: Vec<Point> = body
            .cts
            .iter()
            .map(|ct| self.group.curve.sub(ct, &shared))
            .collect();
        Ok(self.koblitz.decode(&points)?)
    }

    /// Adds an encryption layer under `public_key`: appends a fresh helper
    /// point and shifts every point ciphertext by `r·P`.
    ///
    /// # Panics
    /// Panics if `public_key` is not on the curve.
    pub fn add_layer<R: Rng + CryptoRng>(
        &self,
        rng: &mut R,
        armored: &str,
        public_key: &Point,
    ) -> Result<String, EciesError> {
        assert!(
            self.group.curve.contains(public_key),
            "public key must be on the curve"
        );
        let mut body = CipherBody::from_armor(armored)?;
        let r = self.group.random_scalar(rng);
        let shared = self.group.curve.mul(public_key, &r);

        let label = body.next_label();
        body.helpers.insert(label, self.group.mul_generator(&r));
        body.cts = body
            .cts
            .iter()
            .map(|ct| self.group.curve.add(ct, &shared))
            .collect();
        Ok(body.armor())
    }

    /// Removes the layer identified by `label` using the matching private
    /// key, dropping its helper point. The result is still a valid
    /// ciphertext under the remaining layers.
    pub fn remove_layer(
        &self,
        armored: &str,
        label: &str,
        private_key: &BigUint,
    ) -> Result<String, EciesError> {
        let mut body = CipherBody::from_armor(armored)?;
        let helper = body
            .helpers
            .remove(label)
            .ok_or_else(|| EciesError::LayerNotFound(label.to_owned()))?;
        let shared = self.group.curve.mul(&helper, private_key);
        body.cts = body
            .cts
            .iter()
            .map(|ct| self.group.curve.sub(ct, &shared))
            .collect();
        Ok(body.armor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::tests::p192;
    use rand::SeedableRng as _;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn single_layer_round_trip() {
        let group = p192();
        let cipher = Ecies::new(group.clone());
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let (sk, pk) = group.generate_keypair(&mut rng);

        let msg = b"0000000C 7E9A1B2D 00000000 00000000 0000FFFF";
        let ct = cipher.encrypt(&mut rng, msg, &pk).unwrap();
        assert_eq!(cipher.decrypt(&ct, &sk).unwrap(), msg);
    }

    #[test]
    fn wrong_key_garbles_plaintext() {
        let group = p192();
        let cipher = Ecies::new(group.clone());
        let mut rng = ChaCha12Rng::seed_from_u64(4);
        let (_, pk) = group.generate_keypair(&mut rng);
        let (other_sk, _) = group.generate_keypair(&mut rng);

        let ct = cipher.encrypt(&mut rng, b"sensitive", &pk).unwrap();
        match cipher.decrypt(&ct, &other_sk) {
            Ok(decrypted) => assert_ne!(decrypted, b"sensitive"),
            Err(EciesError::Koblitz(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn layers_commute() {
        let group = p192();
        let cipher = Ecies::new(group.clone());
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        let (sk_a, pk_a) = group.generate_keypair(&mut rng);
        let (sk_b, pk_b) = group.generate_keypair(&mut rng);

        let msg = b"the shared secret block";
        let layered = cipher.encrypt(&mut rng, msg, &pk_a).unwrap();
        let layered = cipher.add_layer(&mut rng, &layered, &pk_b).unwrap();

        // Inner layer (c1, key A) stripped first, outer decrypted last.
        let stripped = cipher.remove_layer(&layered, "c1", &sk_a).unwrap();
        assert_eq!(cipher.decrypt(&stripped, &sk_b).unwrap(), msg);

        // And the other order.
        let stripped = cipher.remove_layer(&layered, "c2", &sk_b).unwrap();
        assert_eq!(cipher.decrypt(&stripped, &sk_a).unwrap(), msg);
    }

    #[test]
    fn decrypt_refuses_multi_layer() {
        let group = p192();
        let cipher = Ecies::new(group.clone());
        let mut rng = ChaCha12Rng::seed_from_u64(6);
        let (sk_a, pk_a) = group.generate_keypair(&mut rng);
        let (_, pk_b) = group.generate_keypair(&mut rng);

        let ct = cipher.encrypt(&mut rng, b"x", &pk_a).unwrap();
        let layered = cipher.add_layer(&mut rng, &ct, &pk_b).unwrap();
        assert!(matches!(
            cipher.decrypt(&layered, &sk_a),
            Err(EciesError::LayeredCiphertext(2))
        ));
        assert!(matches!(
            cipher.remove_layer(&ct, "c9", &sk_a),
            Err(EciesError::LayerNotFound(_))
        ));
    }
}
