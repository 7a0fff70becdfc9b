//! SM2-style signatures over the system curve.
//!
//! The scheme binds the signer identity into the digest through the `ZA`
//! prefix: a hash over the signer id, the curve parameters and the public
//! key, each parameter encoded big-endian with the byte width derived from
//! `bitlen(p)`. Message digests use SHA-256 (the system hash).

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use sha2::{Digest as _, Sha256};

use crate::arith;
use crate::codec;
use crate::curve::{Group, Point};

/// A signature pair `(r, s)`, serialized on the wire as a two-element array
/// of grouped hex strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// The `r` component.
    pub r: BigUint,
    /// The `s` component.
    pub s: BigUint,
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [codec::int_to_hex(&self.r), codec::int_to_hex(&self.s)].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [r, s] = <[String; 2]>::deserialize(deserializer)?;
        Ok(Signature {
            r: codec::hex_to_int(&r).map_err(D::Error::custom)?,
            s: codec::hex_to_int(&s).map_err(D::Error::custom)?,
        })
    }
}

/// Signer/verifier bound to a group and a signer identity.
#[derive(Debug, Clone)]
pub struct Sm2 {
    group: Group,
    user_id: String,
}

impl Sm2 {
    /// Creates the scheme for `group` with the hex-encoded signer identity
    /// (the coordinator id in this system).
    pub fn new(group: Group, user_id: impl Into<String>) -> Self {
        Sm2 {
            group,
            user_id: user_id.into(),
        }
    }

    /// Byte width used for curve parameters and coordinates inside `ZA`,
    /// derived from the curve prime.
    fn param_width(&self) -> usize {
        (self.group.curve.p().bits() as usize).div_ceil(8)
    }

    fn fixed_width(&self, value: &BigUint) -> Vec<u8> {
        let width = self.param_width();
        let bytes = value.to_bytes_be();
        let mut out = vec![0u8; width.saturating_sub(bytes.len())];
        out.extend(bytes);
        out
    }

    /// Computes the identity hash `ZA` for `public_key`.
    pub fn compute_za(&self, public_key: &Point) -> Vec<u8> {
        let id_bytes = hex::decode(&self.user_id).unwrap_or_else(|_| self.user_id.clone().into_bytes());
        let entl = (id_bytes.len() as u16 * 8).to_be_bytes();

        let mut hasher = Sha256::new();
        hasher.update(entl);
        hasher.update(&id_bytes);
        hasher.update(self.fixed_width(self.group.curve.a()));
        hasher.update(self.fixed_width(self.group.curve.b()));
        hasher.update(self.fixed_width(self.group.generator.x().expect("G is affine")));
        hasher.update(self.fixed_width(self.group.generator.y().expect("G is affine")));
        hasher.update(self.fixed_width(public_key.x().expect("public key is affine")));
        hasher.update(self.fixed_width(public_key.y().expect("public key is affine")));
        hasher.finalize().to_vec()
    }

    fn digest(&self, za: &[u8], message: &[u8]) -> BigUint {
        let mut hasher = Sha256::new();
        hasher.update(za);
        hasher.update(message);
        BigUint::from_bytes_be(&hasher.finalize())
    }

    /// Signs `message` with `private_key`, retrying the nonce until the
    /// `r`/`s` side conditions hold.
    pub fn sign<R: Rng + CryptoRng>(
        &self,
        rng: &mut R,
        message: &[u8],
        za: &[u8],
        private_key: &BigUint,
    ) -> Signature {
        let n = &self.group.order;
        let e = self.digest(za, message) % n;
        let one_plus_d_inv = arith::mod_inverse(&((BigUint::one() + private_key) % n), n)
            .expect("1 + d is invertible for a valid private key");

        loop {
            let k = self.group.random_scalar(rng);
            let point = self.group.mul_generator(&k);
            let Some(x1) = point.x() else { continue };
            let r = (&e + x1) % n;
            if r.is_zero() || (&r + &k) == *n {
                continue;
            }
            let s = (&one_plus_d_inv * arith::sub_mod(&k, &(&r * private_key), n)) % n;
            if s.is_zero() {
                continue;
            }
            return Signature { r, s };
        }
    }

    /// Verifies `signature` over `message` under `public_key`.
    pub fn verify(
        &self,
        signature: &Signature,
        message: &[u8],
        za: &[u8],
        public_key: &Point,
    ) -> bool {
        let n = &self.group.order;
        let Signature { r, s } = signature;
        if r.is_zero() || r >= n || s.is_zero() || s >= n {
            return false;
        }

        let e = self.digest(za, message) % n;
        let t = (r + s) % n;
        let point = self.group.curve.add(
            &self.group.mul_generator(s),
            &self.group.curve.mul(public_key, &t),
        );
        match point.x() {
            Some(x1) => (&e + x1) % n == *r,
            None => false,
        }
    }
}
