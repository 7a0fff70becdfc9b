//! Upload-time share dealing: polynomial, commitments, per-node
//! signcryption and fan-out payloads.

use std::collections::BTreeMap;
use std::sync::Arc;

use num_bigint::BigUint;
use rand::{CryptoRng, Rng};
use shardvault_core::codec;
use shardvault_core::curve::{Group, Point};
use shardvault_core::dealing::{self, DealError};
use shardvault_core::ecies::{Ecies, EciesError};
use shardvault_core::sm2::Sm2;
use shardvault_types::api::v1::SignCryptionRequest;
use shardvault_types::records::NodeRecord;

/// Errors of the dealer.
#[derive(Debug, thiserror::Error)]
pub enum DealerError {
    /// Share generation failure (bad key, threshold too small).
    #[error(transparent)]
    Deal(#[from] DealError),
    /// Share encryption failure.
    #[error(transparent)]
    Encrypt(#[from] EciesError),
}

/// Deals shares and produces the signed fan-out payloads.
#[derive(Clone)]
pub struct ShareDealer {
    group: Group,
    threshold: u32,
    ecies: Ecies,
    sm2: Sm2,
    signing_key: Arc<BigUint>,
    signer_za: Arc<Vec<u8>>,
}

impl ShareDealer {
    /// Bundles the crypto material the dealer needs.
    pub fn new(
        group: Group,
        threshold: u32,
        sm2: Sm2,
        signing_key: Arc<BigUint>,
        signer_za: Arc<Vec<u8>>,
    ) -> Self {
        ShareDealer {
            ecies: Ecies::new(group.clone()),
            group,
            threshold,
            sm2,
            signing_key,
            signer_za,
        }
    }

    /// Deals `file_key` to `nodes`.
    ///
    /// Returns the commitment map for the file record and one
    /// `(node address, signcryption payload)` pair per node: the share
    /// encrypted under the node's long-term key and signed with the
    /// coordinator's SM2 key.
    pub fn deal<R: Rng + CryptoRng>(
        &self,
        rng: &mut R,
        file_uuid: &str,
        file_key: &str,
        nodes: &[NodeRecord],
    ) -> Result<(BTreeMap<u32, Point>, Vec<(String, SignCryptionRequest)>), DealerError> {
        let node_ids: Vec<String> = nodes.iter().map(|node| node.id.clone()).collect();
        let dealing = dealing::deal_key(rng, &self.group, self.threshold, file_key, &node_ids)?;

        let mut payloads = Vec::with_capacity(nodes.len());
        for (node, (_, share)) in nodes.iter().zip(dealing.shares.iter()) {
            let ciphertext =
                self.ecies
                    .encrypt(rng, codec::int_to_hex(share).as_bytes(), &node.public_key)?;
            let signature =
                self.sm2
                    .sign(rng, ciphertext.as_bytes(), &self.signer_za, &self.signing_key);
            payloads.push((
                node.address.clone(),
                SignCryptionRequest {
                    server_id: node.id.clone(),
                    file_uuid: file_uuid.to_owned(),
                    ciphertext,
                    signature,
                },
            ));
        }
        Ok((dealing.commitments, payloads))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::SeedableRng as _;
    use rand_chacha::ChaCha12Rng;
    use shardvault_core::poly::Polynomial;
    use shardvault_types::params::CurveParameters;
    use shardvault_types::records::NodeStatus;

    fn group() -> Group {
        let c = CurveParameters::named("secp192r1").unwrap();
        Group::new(
            shardvault_core::curve::Curve::new(c.p, c.a, c.b),
            Point::affine(c.gx, c.gy),
            c.order,
        )
    }

    #[test]
    fn dealt_payloads_verify_and_reconstruct() {
        let group = group();
        let mut rng = ChaCha12Rng::seed_from_u64(61);
        let sm2 = Sm2::new(group.clone(), "AA".repeat(16));
        let (signing_key, signer_pk) = group.generate_keypair(&mut rng);
        let signer_za = Arc::new(sm2.compute_za(&signer_pk));

        let node_keys: Vec<_> = (0..5).map(|_| group.generate_keypair(&mut rng)).collect();
        let nodes: Vec<NodeRecord> = node_keys
            .iter()
            .enumerate()
            .map(|(i, (_, pk))| NodeRecord {
                id: format!("{:032X}", 0xB00 + i),
                address: format!("http://127.0.0.1:91{i:02}"),
                public_key: pk.clone(),
                status: NodeStatus::Active,
                last_heartbeat: Utc::now().timestamp_millis(),
            })
            .collect();

        let dealer = ShareDealer::new(
            group.clone(),
            3,
            sm2.clone(),
            Arc::new(signing_key),
            signer_za.clone(),
        );
        let key = "00112233445566778899aabbccddeeff";
        let (commits, payloads) = dealer.deal(&mut rng, "FILE", key, &nodes).unwrap();
        assert_eq!(commits.len(), 3);
        assert_eq!(payloads.len(), 5);

        // Every payload verifies under the coordinator key and decrypts to a
        // share that passes the commitment check.
        let ecies = Ecies::new(group.clone());
        let mut points = Vec::new();
        for ((sk, _), (_, payload)) in node_keys.iter().zip(&payloads) {
            assert!(sm2.verify(
                &payload.signature,
                payload.ciphertext.as_bytes(),
                &signer_za,
                &signer_pk
            ));
            let share_hex = ecies.decrypt(&payload.ciphertext, sk).unwrap();
            let share = codec::hex_to_int(std::str::from_utf8(&share_hex).unwrap()).unwrap();
            let id = codec::hex_to_int(&payload.server_id).unwrap();
            assert!(dealing::verify_share(&group, &commits, &id, &share));
            points.push((id, share));
        }

        let coeffs = Polynomial::lagrange_coefficients(&points[..3], &group.order).unwrap();
        assert_eq!(dealing::recover_key(&coeffs, 3, key.len()).unwrap(), key);
    }
}
