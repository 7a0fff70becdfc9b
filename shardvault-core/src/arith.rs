//! Modular arithmetic helpers used by the curve and polynomial modules.
//!
//! All functions operate on [`BigUint`] values and a prime (or at least odd)
//! modulus. Square roots are computed with Tonelli–Shanks, with the usual
//! `p ≡ 3 (mod 4)` fast path.

use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};

/// Returns `(a - b) mod m` for values already reduced or not.
pub fn sub_mod(a: &BigUint, b: &BigUint, m: &BigUint) -> BigUint {
    let a = a % m;
    let b = b % m;
    if a >= b { (a - b) % m } else { (a + m - b) % m }
}

/// Returns the modular inverse of `a` modulo `m` via the extended Euclidean
/// algorithm, or `None` when `gcd(a, m) != 1`.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    let m_int = BigInt::from(m.clone());
    let mut r0 = m_int.clone();
    let mut r1 = BigInt::from(a % m);
    // Invariant: s_i * a ≡ r_i (mod m)
    let mut s0 = BigInt::zero();
    let mut s1 = BigInt::one();

    while !r1.is_zero() {
        let q = &r0 / &r1;
        let r2 = &r0 - &q * &r1;
        let s2 = &s0 - &q * &s1;
        r0 = std::mem::replace(&mut r1, r2);
        s0 = std::mem::replace(&mut s1, s2);
    }

    if !r0.is_one() {
        return None;
    }
    let inv = ((s0 % &m_int) + &m_int) % &m_int;
    inv.to_biguint()
}

/// Computes the Legendre symbol `(n / p)` as `n^((p-1)/2) mod p`.
///
/// The result is `1` for quadratic residues, `p - 1` for non-residues and
/// `0` when `p` divides `n`.
pub fn legendre(n: &BigUint, p: &BigUint) -> BigUint {
    let exp = (p - 1u32) >> 1;
    n.modpow(&exp, p)
}

/// Solves `y² ≡ n (mod p)` for prime `p`.
///
/// Returns one of the two roots (the caller derives the other as `p - y`),
/// or `None` when `n` is a quadratic non-residue modulo `p`.
pub fn tonelli_shanks(n: &BigUint, p: &BigUint) -> Option<BigUint> {
    let n = n % p;
    if n.is_zero() {
        return Some(BigUint::zero());
    }
    if *p == BigUint::from(2u32) {
        return Some(n);
    }
    if !legendre(&n, p).is_one() {
        return None;
    }

    // Fast path for p ≡ 3 (mod 4).
    if (p % 4u32) == BigUint::from(3u32) {
        let exp = (p + 1u32) >> 2;
        return Some(n.modpow(&exp, p));
    }

    // Write p - 1 = q * 2^s with q odd.
    let mut q = p - 1u32;
    let mut s = 0u32;
    while (&q % 2u32).is_zero() {
        q >>= 1;
        s += 1;
    }

    // Find a quadratic non-residue z.
    let mut z = BigUint::from(2u32);
    while legendre(&z, p) != p - 1u32 {
        z += 1u32;
    }

    let mut c = z.modpow(&q, p);
    let mut t = n.modpow(&q, p);
    let mut r = n.modpow(&((&q + 1u32) >> 1), p);
    let mut m = s;

    while !t.is_one() {
        // Smallest i with t^(2^i) ≡ 1 (mod p).
        let mut i = 0u32;
        let mut probe = t.clone();
        while !probe.is_one() && i < m {
            probe = probe.modpow(&BigUint::from(2u32), p);
            i += 1;
        }
        if i == m {
            return None;
        }

        let b = c.modpow(&(BigUint::one() << (m - i - 1)), p);
        m = i;
        c = b.modpow(&BigUint::from(2u32), p);
        t = (t * &c) % p;
        r = (r * &b) % p;
    }

    Some(r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mod_inverse_round_trip() {
        // secp192r1 group order
        let m = BigUint::parse_bytes(
            b"6277101735386680763835789423176059013767194773182842284081",
            10,
        )
        .unwrap();
        for a in [3u64, 17, 123_456_789, u64::MAX] {
            let a = BigUint::from(a);
            let inv = mod_inverse(&a, &m).expect("inverse exists for coprime values");
            assert!(((a * inv) % &m).is_one());
        }
    }

    #[test]
    fn mod_inverse_rejects_non_coprime() {
        let m = BigUint::from(12u32);
        assert!(mod_inverse(&BigUint::from(4u32), &m).is_none());
    }

    #[test]
    fn tonelli_shanks_fast_path() {
        // 23 ≡ 3 (mod 4)
        let p = BigUint::from(23u32);
        let n = BigUint::from(13u32); // 6^2 = 36 ≡ 13
        let y = tonelli_shanks(&n, &p).expect("13 is a residue mod 23");
        assert_eq!((&y * &y) % &p, n);
    }

    #[test]
    fn tonelli_shanks_general_case() {
        // 17 ≡ 1 (mod 4), exercises the full loop.
        let p = BigUint::from(17u32);
        let n = BigUint::from(13u32); // 8^2 = 64 ≡ 13
        let y = tonelli_shanks(&n, &p).expect("13 is a residue mod 17");
        assert_eq!((&y * &y) % &p, n);
    }

    #[test]
    fn tonelli_shanks_non_residue() {
        let p = BigUint::from(23u32);
        assert!(tonelli_shanks(&BigUint::from(5u32), &p).is_none());
    }
}
