#![deny(missing_docs)]
//! Cryptographic core of the shardvault threshold file-storage protocol.
//!
//! This crate implements the primitives shared by the coordinator, the storage
//! nodes and the client:
//!
//! - modular arithmetic and square roots ([`arith`])
//! - short-Weierstrass curve operations over a prime field ([`curve`])
//! - sparse polynomials over `ℤ_N` with full Lagrange reconstruction ([`poly`])
//! - Koblitz embedding of byte strings into curve points ([`koblitz`])
//! - layered ECC encryption, the mechanism behind the blinding-removal
//!   re-encryption performed by storage nodes ([`ecies`])
//! - SM2-style signatures binding the coordinator identity ([`sm2`])
//! - share dealing and mask-guided key recovery ([`dealing`])
//! - the AES-CBC file body cipher ([`filecipher`])
//! - PEM armor for long-term key material ([`keys`])
//!
//! Everything here is transport-agnostic: no networking, no storage. The wire
//! representation of big integers and points (uppercase grouped hex, `[x, y]`
//! point arrays) lives in [`codec`] and is used by the serde impls of the
//! types in this crate, so ciphertexts and signatures serialize the same way
//! everywhere.
//!
//! All randomness is drawn through [`rand::Rng`] + [`rand::CryptoRng`] bounds;
//! callers are expected to pass a cryptographically secure generator.

pub mod arith;
pub mod codec;
pub mod curve;
pub mod dealing;
pub mod ecies;
pub mod filecipher;
pub mod keys;
pub mod koblitz;
pub mod poly;
pub mod sm2;

/// Computes the uppercase SHA-256 hex digest of `data`.
///
/// This is the digest format used across the protocol for file hashes,
/// password hashes and deterministic file identifiers.
pub fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest as _, Sha256};
    let digest = Sha256::digest(data);
    hex::encode_upper(digest)
}
