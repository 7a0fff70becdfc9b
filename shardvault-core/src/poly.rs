//! Sparse polynomials over the integer field `ℤ_N`.
//!
//! The representation is a map `exponent → coefficient` with coefficients
//! kept reduced modulo the field order. Besides the ring operations, the
//! module provides Lagrange reconstruction of the *full* coefficient set from
//! `k + 1` evaluation points, which is what the downloader needs to recover
//! every block of the shared secret (not only the constant term).

use std::collections::BTreeMap;

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::arith;

/// Errors of the polynomial ring operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolyError {
    /// Two polynomials with different moduli were combined.
    #[error("cannot combine polynomials over different moduli")]
    ModulusMismatch,
    /// Invalid input to an operation, e.g. duplicate x-coordinates in
    /// interpolation or a non-invertible denominator.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// A sparse polynomial with coefficients in `ℤ_modulus`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polynomial {
    coef: BTreeMap<u32, BigUint>,
    modulus: BigUint,
}

impl Polynomial {
    /// Builds a polynomial from an `exponent → coefficient` map, reducing all
    /// coefficients and dropping the ones that vanish.
    pub fn new(coef: BTreeMap<u32, BigUint>, modulus: BigUint) -> Self {
        let coef = coef
            .into_iter()
            .map(|(k, v)| (k, v % &modulus))
            .filter(|(_, v)| !v.is_zero())
            .collect();
        Polynomial { coef, modulus }
    }

    /// The constant polynomial `c`.
    pub fn constant(c: BigUint, modulus: BigUint) -> Self {
        Self::new(BTreeMap::from([(0, c)]), modulus)
    }

    /// The zero polynomial.
    pub fn zero(modulus: BigUint) -> Self {
        Polynomial {
            coef: BTreeMap::new(),
            modulus,
        }
    }

    /// The degree, or `None` for the zero polynomial.
    pub fn degree(&self) -> Option<u32> {
        self.coef.keys().next_back().copied()
    }

    /// The field order the coefficients live in.
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// The coefficient of `x^exp` (zero when absent).
    pub fn coefficient(&self, exp: u32) -> BigUint {
        self.coef.get(&exp).cloned().unwrap_or_default()
    }

    /// Borrows the sparse coefficient map.
    pub fn coefficients(&self) -> &BTreeMap<u32, BigUint> {
        &self.coef
    }

    /// Evaluates the polynomial at `x`.
    pub fn evaluate(&self, x: &BigUint) -> BigUint {
        let mut acc = BigUint::zero();
        for (exp, coeff) in &self.coef {
            let term = coeff * x.modpow(&BigUint::from(*exp), &self.modulus);
            acc = (acc + term) % &self.modulus;
        }
        acc
    }

    fn check_modulus(&self, other: &Polynomial) -> Result<(), PolyError> {
        if self.modulus != other.modulus {
            return Err(PolyError::ModulusMismatch);
        }
        Ok(())
    }

    /// Polynomial addition.
    pub fn add(&self, other: &Polynomial) -> Result<Polynomial, PolyError> {
        self.check_modulus(other)?;
        let mut coef = self.coef.clone();
        for (exp, coeff) in &other.coef {
            let entry = coef.entry(*exp).or_default();
            *entry = (&*entry + coeff) % &self.modulus;
        }
        Ok(Polynomial::new(coef, self.modulus.clone()))
    }

    /// Additive inverse: every coefficient `c` becomes `modulus - c`.
    pub fn neg(&self) -> Polynomial {
        let coef = self
            .coef
            .iter()
            .map(|(exp, coeff)| (*exp, (&self.modulus - coeff) % &self.modulus))
            .collect();
        Polynomial::new(coef, self.modulus.clone())
    }

    /// Polynomial subtraction.
    pub fn sub(&self, other: &Polynomial) -> Result<Polynomial, PolyError> {
        self.check_modulus(other)?;
        self.add(&other.neg())
    }

    /// Multiplication by a scalar.
    pub fn scale(&self, scalar: &BigUint) -> Polynomial {
        let coef = self
            .coef
            .iter()
            .map(|(exp, coeff)| (*exp, (coeff * scalar) % &self.modulus))
            .collect();
        Polynomial::new(coef, self.modulus.clone())
    }

    /// Polynomial multiplication with coefficient reduction.
    pub fn mul(&self, other: &Polynomial) -> Result<Polynomial, PolyError> {
        self.check_modulus(other)?;
        let mut coef: BTreeMap<u32, BigUint> = BTreeMap::new();
        for (e1, c1) in &self.coef {
            for (e2, c2) in &other.coef {
                let entry = coef.entry(e1 + e2).or_default();
                *entry = (&*entry + c1 * c2) % &self.modulus;
            }
        }
        Ok(Polynomial::new(coef, self.modulus.clone()))
    }

    /// Reconstructs the full coefficient set of the unique degree-`< k`
    /// polynomial through `k` distinct points.
    ///
    /// Returns [`PolyError::InvalidInput`] when two points share an
    /// x-coordinate or a Lagrange denominator is not invertible.
    pub fn lagrange_coefficients(
        points: &[(BigUint, BigUint)],
        modulus: &BigUint,
    ) -> Result<BTreeMap<u32, BigUint>, PolyError> {
        let mut seen = std::collections::HashSet::new();
        for (x, _) in points {
            if !seen.insert(x % modulus) {
                return Err(PolyError::InvalidInput(
                    "evaluation points must be distinct".into(),
                ));
            }
        }

        let mut acc = Polynomial::zero(modulus.clone());
        for (i, (xi, yi)) in points.iter().enumerate() {
            // Numerator: Π_{j≠i} (x - x_j)
            let mut numer = Polynomial::constant(BigUint::one(), modulus.clone());
            let mut denom = BigUint::one();
            for (j, (xj, _)) in points.iter().enumerate() {
                if i == j {
                    continue;
                }
                let linear = Polynomial::new(
                    BTreeMap::from([(0, (modulus - (xj % modulus)) % modulus), (1, BigUint::one())]),
                    modulus.clone(),
                );
                numer = numer.mul(&linear)?;
                denom = (denom * arith::sub_mod(xi, xj, modulus)) % modulus;
            }
            let denom_inv = arith::mod_inverse(&denom, modulus).ok_or_else(|| {
                PolyError::InvalidInput("lagrange denominator is not invertible".into())
            })?;
            let basis = numer.scale(&((denom_inv * yi) % modulus));
            acc = acc.add(&basis)?;
        }
        Ok(acc.coef)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::RandBigInt as _;
    use rand::SeedableRng as _;
    use rand_chacha::ChaCha12Rng;

    fn modulus() -> BigUint {
        BigUint::parse_bytes(b"ffffffffffffffffffffffff99def836146bc9b1b4d22831", 16).unwrap()
    }

    fn poly(pairs: &[(u32, u64)]) -> Polynomial {
        Polynomial::new(
            pairs
                .iter()
                .map(|(e, c)| (*e, BigUint::from(*c)))
                .collect(),
            modulus(),
        )
    }

    #[test]
    fn evaluation() {
        // 3x² + 2x + 7 at x = 5
        let p = poly(&[(2, 3), (1, 2), (0, 7)]);
        assert_eq!(p.evaluate(&BigUint::from(5u32)), BigUint::from(92u32));
    }

    #[test]
    fn ring_operations() {
        let p = poly(&[(1, 4), (0, 1)]);
        let q = poly(&[(1, 2), (0, 3)]);
        let sum = p.add(&q).unwrap();
        assert_eq!(sum.coefficient(1), BigUint::from(6u32));
        assert_eq!(sum.coefficient(0), BigUint::from(4u32));

        let diff = p.sub(&q).unwrap();
        assert_eq!(diff.coefficient(1), BigUint::from(2u32));

        // (4x + 1)(2x + 3) = 8x² + 14x + 3
        let prod = p.mul(&q).unwrap();
        assert_eq!(prod.coefficient(2), BigUint::from(8u32));
        assert_eq!(prod.coefficient(1), BigUint::from(14u32));
        assert_eq!(prod.coefficient(0), BigUint::from(3u32));

        let zero = p.sub(&p).unwrap();
        assert_eq!(zero.degree(), None);
    }

    #[test]
    fn modulus_mismatch_is_rejected() {
        let p = poly(&[(1, 1)]);
        let q = Polynomial::constant(BigUint::one(), BigUint::from(97u32));
        assert_eq!(p.add(&q).unwrap_err(), PolyError::ModulusMismatch);
        assert_eq!(p.mul(&q).unwrap_err(), PolyError::ModulusMismatch);
    }

    #[test]
    fn lagrange_recovers_all_coefficients() {
        let modulus = modulus();
        let mut rng = ChaCha12Rng::seed_from_u64(42);
        for degree in [1usize, 2, 4, 7] {
            let coef: BTreeMap<u32, BigUint> = (0..=degree as u32)
                .map(|e| (e, rng.gen_biguint_below(&modulus)))
                .collect();
            let p = Polynomial::new(coef.clone(), modulus.clone());
            let points: Vec<(BigUint, BigUint)> = (1..=degree as u64 + 1)
                .map(|x| {
                    let x = BigUint::from(x);
                    let y = p.evaluate(&x);
                    (x, y)
                })
                .collect();
            let recovered = Polynomial::lagrange_coefficients(&points, &modulus).unwrap();
            assert_eq!(recovered, p.coef);
        }
    }

    #[test]
    fn lagrange_rejects_duplicate_x() {
        let modulus = modulus();
        let points = vec![
            (BigUint::from(1u32), BigUint::from(5u32)),
            (BigUint::from(1u32), BigUint::from(9u32)),
        ];
        assert!(matches!(
            Polynomial::lagrange_coefficients(&points, &modulus),
            Err(PolyError::InvalidInput(_))
        ));
    }
}
