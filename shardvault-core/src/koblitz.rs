//! Koblitz embedding of opaque byte strings into curve points.
//!
//! A message is PKCS7-padded to the block size derived from the curve prime
//! and the try budget `K`, each block is read as a big-endian integer `m`,
//! and the encoder searches `x = m·K + j` for the first `j ∈ [0, K)` whose
//! curve equation right-hand side is a quadratic residue. Decoding divides
//! the x-coordinate by `K` and strips the padding.

use num_bigint::BigUint;

use crate::curve::{Curve, Point};

/// Try budget per block. With `K = 100000` a failing block is astronomically
/// unlikely for any practically sized prime.
pub const TRY_BUDGET: u32 = 100_000;

/// Errors of the Koblitz codec.
#[derive(Debug, thiserror::Error)]
pub enum KoblitzError {
    /// No quadratic residue was found within the try budget.
    #[error("no curve point found for block within {TRY_BUDGET} attempts")]
    EncodingExhausted,
    /// A point handed to the decoder was the point at infinity.
    #[error("cannot decode the point at infinity")]
    UnexpectedInfinity,
    /// The decoded byte stream carries invalid PKCS7 padding.
    #[error("invalid padding in decoded data")]
    InvalidPadding,
}

/// Encoder/decoder between byte strings and points of a fixed curve.
#[derive(Debug, Clone)]
pub struct KoblitzCodec {
    curve: Curve,
    block_size: usize,
}

impl KoblitzCodec {
    /// Derives the block size for `curve` from the try budget: the largest
    /// `b` such that any `b`-byte block `m` keeps `m·K + K - 1` below `p`.
    pub fn new(curve: Curve) -> Self {
        let max_block = curve.p() / TRY_BUDGET - 1u32;
        let block_size = ((max_block.bits() as usize) + 7) / 8;
        KoblitzCodec { curve, block_size }
    }

    /// The derived block size in bytes.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    fn encode_block(&self, m: &BigUint) -> Result<Point, KoblitzError> {
        let base = m * TRY_BUDGET;
        for j in 0..TRY_BUDGET {
            let x = &base + j;
            if &x >= self.curve.p() {
                break;
            }
            if let Some((y, _)) = self.curve.y_candidates(&x) {
                return Ok(Point::affine(x, y));
            }
        }
        Err(KoblitzError::EncodingExhausted)
    }

    /// Encodes `data` into a sequence of curve points.
    pub fn encode(&self, data: &[u8]) -> Result<Vec<Point>, KoblitzError> {
        let pad = self.block_size - data.len() % self.block_size;
        let mut padded = data.to_vec();
        padded.extend(std::iter::repeat_n(pad as u8, pad));

        padded
            .chunks(self.block_size)
            .map(|chunk| self.encode_block(&BigUint::from_bytes_be(chunk)))
            .collect()
    }

    /// Decodes a sequence of points back into the original byte string.
    pub fn decode(&self, points: &[Point]) -> Result<Vec<u8>, KoblitzError> {
        let mut stream = Vec::with_capacity(points.len() * self.block_size);
        for point in points {
            let x = point.x().ok_or(KoblitzError::UnexpectedInfinity)?;
            let m = x / TRY_BUDGET;
            let bytes = m.to_bytes_be();
            if bytes.len() > self.block_size {
                return Err(KoblitzError::InvalidPadding);
            }
            stream.extend(std::iter::repeat_n(0u8, self.block_size - bytes.len()));
            stream.extend(bytes);
        }

        let pad = *stream.last().ok_or(KoblitzError::InvalidPadding)? as usize;
        if pad == 0 || pad > self.block_size || pad > stream.len() {
            return Err(KoblitzError::InvalidPadding);
        }
        if !stream[stream.len() - pad..].iter().all(|b| *b as usize == pad) {
            return Err(KoblitzError::InvalidPadding);
        }
        stream.truncate(stream.len() - pad);
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::tests::p192;
    use rand::{Rng as _, SeedableRng as _};
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn encoded_points_are_on_curve() {
        let group = p192();
        let codec = KoblitzCodec::new(group.curve.clone());
        let points = codec.encode(b"attack at dawn").unwrap();
        for point in &points {
            assert!(group.curve.contains(point));
        }
    }

    #[test]
    fn round_trip_various_lengths() {
        let group = p192();
        let codec = KoblitzCodec::new(group.curve);
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        for len in [0usize, 1, 15, 16, 17, 100, 1024, 10 * 1024] {
            let mut data = vec![0u8; len];
            rng.fill(data.as_mut_slice());
            let points = codec.encode(&data).unwrap();
            assert_eq!(codec.decode(&points).unwrap(), data);
        }
    }

    #[test]
    fn tampered_padding_is_rejected() {
        let group = p192();
        let codec = KoblitzCodec::new(group.curve.clone());
        let mut points = codec.encode(b"payload").unwrap();
        // Replace the last point with an encoding of a block whose final byte
        // is 0x00, never a valid PKCS7 padding length.
        points.pop();
        points.push(codec.encode_block(&BigUint::from(256u32)).unwrap());
        assert!(matches!(
            codec.decode(&points),
            Err(KoblitzError::InvalidPadding)
        ));
    }
}
