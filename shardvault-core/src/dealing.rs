//! Share dealing and key recovery for the threshold file-key protocol.
//!
//! At upload time the coordinator splits the *decimal* representation of the
//! file key into `m` blocks, hides the blocks among random coefficients of a
//! degree-(T-1) polynomial, and records which coefficients carry secret
//! blocks in a binary mask stored as the constant term `a₀`. Shares are the
//! polynomial evaluated at each node id; Feldman commitments `Cᵢ = aᵢ·G`
//! allow downloaders to verify shares without learning coefficients.
//!
//! The decimal splitting truncates a block down to the field order when it
//! overflows it, and strips leading zeros per block. This mirrors the
//! deployed behavior; keys whose decimal blocks reach the order, or split
//! with an interior block starting in `0`, do not round-trip. Both cases
//! require `m > 1` blocks — an AES-128 key on a 160+-bit curve always fits
//! in one block at `T = 3`, where reconstruction is exact.

use std::collections::BTreeMap;

use num_bigint::BigUint;
use num_traits::Zero;
use rand::seq::SliceRandom as _;
use rand::{CryptoRng, Rng};

use crate::codec;
use crate::curve::{Group, Point};
use crate::poly::{PolyError, Polynomial};

/// Errors of dealing and recovery.
#[derive(Debug, thiserror::Error)]
pub enum DealError {
    /// The key needs more secret blocks than the threshold leaves room for.
    #[error("key needs {needed} blocks but threshold leaves room for {capacity}")]
    ThresholdTooSmall {
        /// Minimum number of blocks the key splits into.
        needed: usize,
        /// Blocks available: `T - 2`.
        capacity: usize,
    },
    /// The key is not a valid hex integer.
    #[error("malformed key: {0}")]
    BadKey(String),
    /// The recovered coefficient set is inconsistent with the threshold.
    #[error("recovered coefficients are inconsistent: {0}")]
    Inconsistent(String),
    /// Polynomial arithmetic failure.
    #[error(transparent)]
    Poly(#[from] PolyError),
}

/// Result of dealing a key: the secret polynomial, the Feldman commitments
/// for coefficients `0..T`, and one share per node id (in input order).
#[derive(Debug)]
pub struct Dealing {
    /// The secret-sharing polynomial. Callers shall forget it after fan-out.
    pub polynomial: Polynomial,
    /// `i → aᵢ·G` for every `i ∈ [0, T)`.
    pub commitments: BTreeMap<u32, Point>,
    /// `(node id, f(node id))` pairs.
    pub shares: Vec<(String, BigUint)>,
}

/// Splits the decimal string of the key into `blocks` pieces of near-equal
/// width, stripping leading zeros and truncating any block that overflows
/// the field order down to the order.
fn split_secret_blocks(secret: &str, blocks: usize, modulus: &BigUint) -> Vec<BigUint> {
    let length = secret.len();
    let avg = length / blocks;
    let remainder = length % blocks;

    let mut out = Vec::with_capacity(blocks);
    let mut start = 0;
    for i in 0..blocks {
        let extra = usize::from(i < remainder);
        let end = start + avg + extra;
        let digits = secret[start..end].trim_start_matches('0');
        let digits = if digits.is_empty() { "0" } else { digits };
        let value = BigUint::parse_bytes(digits.as_bytes(), 10).expect("decimal digits");
        out.push(if &value > modulus {
            modulus.clone()
        } else {
            value
        });
        start = end;
    }
    out
}

/// Deals `key_hex` into shares for `node_ids` with reconstruction threshold
/// `threshold`.
///
/// Node ids are hex strings; each is interpreted as an integer evaluation
/// point. Fails with [`DealError::ThresholdTooSmall`] when the key cannot be
/// packed into at most `threshold - 2` blocks.
pub fn deal_key<R: Rng + CryptoRng>(
    rng: &mut R,
    group: &Group,
    threshold: u32,
    key_hex: &str,
    node_ids: &[String],
) -> Result<Dealing, DealError> {
    let key = codec::hex_to_int(key_hex).map_err(|e| DealError::BadKey(e.to_string()))?;
    if key.is_zero() {
        return Err(DealError::BadKey("key must be non-zero".into()));
    }

    let order_bits = group.order.bits();
    let needed = (key.bits() as usize).div_ceil(order_bits as usize).max(1);
    let capacity = threshold.saturating_sub(2) as usize;
    if needed > capacity {
        return Err(DealError::ThresholdTooSmall { needed, capacity });
    }
    let blocks = rng.gen_range(needed..=capacity);

    let mut secret_blocks = split_secret_blocks(&key.to_str_radix(10), blocks, &group.order);

    // Mask: `blocks` ones distributed uniformly over T-1 positions.
    let mut mask = vec![1u8; blocks];
    mask.resize(threshold as usize - 1, 0);
    mask.shuffle(rng);

    let mask_bits: String = mask.iter().map(|b| char::from(b'0' + b)).collect();
    let mut coef = BTreeMap::from([(
        0u32,
        BigUint::parse_bytes(mask_bits.as_bytes(), 2).expect("binary digits"),
    )]);
    let mut next_block = 0;
    for (i, bit) in mask.iter().enumerate() {
        let value = if *bit == 1 {
            let block = secret_blocks[next_block].clone();
            next_block += 1;
            block
        } else {
            group.random_scalar(rng)
        };
        coef.insert(i as u32 + 1, value);
    }
    secret_blocks.clear();

    let polynomial = Polynomial::new(coef, group.order.clone());

    let commitments = (0..threshold)
        .map(|i| {
            let point = group.mul_generator(&polynomial.coefficient(i));
            (i, point)
        })
        .collect();

    let shares = node_ids
        .iter()
        .map(|id| {
            let x = codec::hex_to_int(id).map_err(|e| DealError::BadKey(e.to_string()))?;
            Ok((id.clone(), polynomial.evaluate(&(x % &group.order))))
        })
        .collect::<Result<Vec<_>, DealError>>()?;

    Ok(Dealing {
        polynomial,
        commitments,
        shares,
    })
}

/// Checks a share `(node_id, s)` against the Feldman commitments:
/// `s·G == Σᵢ (idⁱ mod N)·Cᵢ`.
pub fn verify_share(
    group: &Group,
    commitments: &BTreeMap<u32, Point>,
    node_id: &BigUint,
    share: &BigUint,
) -> bool {
    let lhs = group.mul_generator(share);
    let mut rhs = Point::Infinity;
    for (exp, commitment) in commitments {
        let power = node_id.modpow(&BigUint::from(*exp), &group.order);
        rhs = group.curve.add(&rhs, &group.curve.mul(commitment, &power));
    }
    lhs == rhs
}

/// Reassembles the file key from a recovered coefficient set.
///
/// The low bits of `a₀` form the mask selecting which coefficients carry
/// secret blocks; their decimal representations are concatenated in
/// positional order and re-read as an integer, emitted as lowercase hex
/// zero-padded to `key_width` characters.
pub fn recover_key(
    coefficients: &BTreeMap<u32, BigUint>,
    threshold: u32,
    key_width: usize,
) -> Result<String, DealError> {
    let width = threshold as usize - 1;
    let a0 = coefficients.get(&0).cloned().unwrap_or_default();
    let mask = a0.to_str_radix(2);
    if mask.len() > width {
        return Err(DealError::Inconsistent(format!(
            "mask of {} bits exceeds threshold width {width}",
            mask.len()
        )));
    }
    let mask = format!("{}{mask}", "0".repeat(width - mask.len()));

    let mut decimal = String::new();
    for (i, bit) in mask.chars().enumerate() {
        if bit == '1' {
            let coeff = coefficients.get(&(i as u32 + 1)).cloned().unwrap_or_default();
            decimal.push_str(&coeff.to_str_radix(10));
        }
    }
    if decimal.is_empty() {
        return Err(DealError::Inconsistent("mask selects no blocks".into()));
    }

    let key = BigUint::parse_bytes(decimal.as_bytes(), 10).expect("decimal digits");
    let hex = key.to_str_radix(16);
    if hex.len() > key_width {
        return Err(DealError::Inconsistent(format!(
            "recovered key of {} hex chars exceeds width {key_width}",
            hex.len()
        )));
    }
    Ok(format!("{}{hex}", "0".repeat(key_width - hex.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::tests::p192;
    use crate::poly::Polynomial;
    use itertools::Itertools as _;
    use rand::SeedableRng as _;
    use rand_chacha::ChaCha12Rng;

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    fn node_ids(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("{:032X}", 0xA000_0000_0000u64 + i as u64 * 7919))
            .collect()
    }

    #[test]
    fn commitments_cover_every_coefficient() {
        let group = p192();
        let mut rng = ChaCha12Rng::seed_from_u64(21);
        let dealing = deal_key(&mut rng, &group, 3, KEY, &node_ids(5)).unwrap();
        assert_eq!(dealing.commitments.len(), 3);
        assert_eq!(dealing.shares.len(), 5);
    }

    #[test]
    fn every_share_passes_commitment_check() {
        let group = p192();
        let mut rng = ChaCha12Rng::seed_from_u64(22);
        let dealing = deal_key(&mut rng, &group, 4, KEY, &node_ids(6)).unwrap();
        for (id, share) in &dealing.shares {
            let id = codec::hex_to_int(id).unwrap();
            assert!(verify_share(&group, &dealing.commitments, &id, share));
            assert!(!verify_share(
                &group,
                &dealing.commitments,
                &id,
                &(share + 1u32)
            ));
        }
    }

    #[test]
    fn any_threshold_subset_recovers_the_key() {
        let group = p192();
        let mut rng = ChaCha12Rng::seed_from_u64(23);
        let ids = node_ids(5);
        let dealing = deal_key(&mut rng, &group, 3, KEY, &ids).unwrap();

        for subset in dealing.shares.iter().combinations(3) {
            let points: Vec<(BigUint, BigUint)> = subset
                .iter()
                .map(|(id, share)| (codec::hex_to_int(id).unwrap(), share.clone()))
                .collect();
            let coeffs = Polynomial::lagrange_coefficients(&points, &group.order).unwrap();
            let recovered = recover_key(&coeffs, 3, KEY.len()).unwrap();
            assert_eq!(recovered, KEY);
        }
    }

    #[test]
    fn oversized_key_is_rejected() {
        let group = p192();
        let mut rng = ChaCha12Rng::seed_from_u64(24);
        // A 512-bit key needs 3 blocks on a 192-bit curve, more than T-2=1.
        let key = "ff".repeat(64);
        let err = deal_key(&mut rng, &group, 3, &key, &node_ids(5)).unwrap_err();
        assert!(matches!(
            err,
            DealError::ThresholdTooSmall {
                needed: 3,
                capacity: 1
            }
        ));
    }

    #[test]
    fn recovery_pads_leading_zeros() {
        let group = p192();
        let mut rng = ChaCha12Rng::seed_from_u64(25);
        let key = "000abc0000000000000000000000cdef";
        let ids = node_ids(5);
        let dealing = deal_key(&mut rng, &group, 3, key, &ids).unwrap();

        let points: Vec<(BigUint, BigUint)> = dealing.shares[..3]
            .iter()
            .map(|(id, share)| (codec::hex_to_int(id).unwrap(), share.clone()))
            .collect();
        let coeffs = Polynomial::lagrange_coefficients(&points, &group.order).unwrap();
        assert_eq!(recover_key(&coeffs, 3, key.len()).unwrap(), key);
    }
}
