//! Short-Weierstrass curve arithmetic over a prime field.
//!
//! Points are affine `(x, y)` pairs with a distinguished point at infinity
//! acting as the group identity. Operations live on [`Curve`] (the point type
//! itself carries no curve handle); [`Group`] bundles a curve with its base
//! point and prime order for the protocol layers above.

use num_bigint::{BigUint, RandBigInt as _};
use num_traits::{One, Zero};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

use crate::arith;
use crate::codec;

/// The curve `y² = x³ + a·x + b (mod p)`.
///
/// Coefficients are stored reduced modulo `p`; a curve created with a
/// "negative" coefficient such as `a = -3` holds `p - 3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Curve {
    p: BigUint,
    a: BigUint,
    b: BigUint,
}

/// An affine curve point or the point at infinity.
///
/// On the wire a point serializes as a two-element array `[x, y]` of grouped
/// hex strings, or `null` for the point at infinity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Point {
    /// The group identity.
    Infinity,
    /// An affine point.
    Affine {
        /// x-coordinate, reduced modulo the curve prime.
        x: BigUint,
        /// y-coordinate, reduced modulo the curve prime.
        y: BigUint,
    },
}

impl Point {
    /// Constructs an affine point. Whether it lies on a given curve is the
    /// caller's concern, see [`Curve::contains`].
    pub fn affine(x: BigUint, y: BigUint) -> Self {
        Point::Affine { x, y }
    }

    /// Returns `true` for the point at infinity.
    pub fn is_infinity(&self) -> bool {
        matches!(self, Point::Infinity)
    }

    /// The x-coordinate, or `None` for the point at infinity.
    pub fn x(&self) -> Option<&BigUint> {
        match self {
            Point::Infinity => None,
            Point::Affine { x, .. } => Some(x),
        }
    }

    /// The y-coordinate, or `None` for the point at infinity.
    pub fn y(&self) -> Option<&BigUint> {
        match self {
            Point::Infinity => None,
            Point::Affine { y, .. } => Some(y),
        }
    }
}

impl Serialize for Point {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Point::Infinity => serializer.serialize_none(),
            Point::Affine { x, y } => {
                [codec::int_to_hex(x), codec::int_to_hex(y)].serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for Point {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let coords = Option::<[String; 2]>::deserialize(deserializer)?;
        match coords {
            None => Ok(Point::Infinity),
            Some([x, y]) => Ok(Point::Affine {
                x: codec::hex_to_int(&x).map_err(D::Error::custom)?,
                y: codec::hex_to_int(&y).map_err(D::Error::custom)?,
            }),
        }
    }
}

impl Curve {
    /// Creates a curve from its parameters, reducing `a` and `b` modulo `p`.
    pub fn new(p: BigUint, a: BigUint, b: BigUint) -> Self {
        let a = a % &p;
        let b = b % &p;
        Curve { p, a, b }
    }

    /// The field prime `p`.
    pub fn p(&self) -> &BigUint {
        &self.p
    }

    /// The coefficient `a`, reduced modulo `p`.
    pub fn a(&self) -> &BigUint {
        &self.a
    }

    /// The coefficient `b`, reduced modulo `p`.
    pub fn b(&self) -> &BigUint {
        &self.b
    }

    /// Checks whether `point` satisfies the curve equation. The point at
    /// infinity is always contained.
    pub fn contains(&self, point: &Point) -> bool {
        match point {
            Point::Infinity => true,
            Point::Affine { x, y } => {
                let lhs = (y * y) % &self.p;
                let rhs = (x * x * x + &self.a * x + &self.b) % &self.p;
                lhs == rhs
            }
        }
    }

    /// Computes the right-hand side `x³ + a·x + b mod p` and returns both
    /// square roots `(y, p - y)`, or `None` when it is a non-residue.
    pub fn y_candidates(&self, x: &BigUint) -> Option<(BigUint, BigUint)> {
        let rhs = (x * x * x + &self.a * x + &self.b) % &self.p;
        let y = arith::tonelli_shanks(&rhs, &self.p)?;
        let other = (&self.p - &y) % &self.p;
        Some((y, other))
    }

    /// Point negation: `-(x, y) = (x, p - y)`.
    pub fn neg(&self, point: &Point) -> Point {
        match point {
            Point::Infinity => Point::Infinity,
            Point::Affine { x, y } => Point::Affine {
                x: x.clone(),
                y: (&self.p - y) % &self.p,
            },
        }
    }

    /// Point addition, covering doubling and the inverse case.
    pub fn add(&self, lhs: &Point, rhs: &Point) -> Point {
        let (x1, y1) = match lhs {
            Point::Infinity => return rhs.clone(),
            Point::Affine { x, y } => (x, y),
        };
        let (x2, y2) = match rhs {
            Point::Infinity => return lhs.clone(),
            Point::Affine { x, y } => (x, y),
        };

        let p = &self.p;
        if x1 == x2 && ((y1 + y2) % p).is_zero() {
            return Point::Infinity;
        }

        let slope = if x1 == x2 {
            // Tangent slope: (3x² + a) / 2y
            let numer = (BigUint::from(3u32) * x1 * x1 + &self.a) % p;
            let denom = (BigUint::from(2u32) * y1) % p;
            let inv = arith::mod_inverse(&denom, p).expect("2y is invertible mod prime p");
            (numer * inv) % p
        } else {
            let numer = arith::sub_mod(y2, y1, p);
            let denom = arith::sub_mod(x2, x1, p);
            let inv = arith::mod_inverse(&denom, p).expect("x2 - x1 is invertible mod prime p");
            (numer * inv) % p
        };

        let x3 = arith::sub_mod(&(&slope * &slope), &((x1 + x2) % p), p);
        let y3 = arith::sub_mod(&(slope * arith::sub_mod(x1, &x3, p)), y1, p);
        Point::Affine { x: x3, y: y3 }
    }

    /// Point subtraction `lhs - rhs`.
    pub fn sub(&self, lhs: &Point, rhs: &Point) -> Point {
        self.add(lhs, &self.neg(rhs))
    }

    /// Scalar multiplication by a non-negative integer via double-and-add.
    ///
    /// Multiplication by zero yields the point at infinity; multiples of the
    /// point's order fall out of the ladder as infinity naturally.
    pub fn mul(&self, point: &Point, scalar: &BigUint) -> Point {
        if scalar.is_zero() || point.is_infinity() {
            return Point::Infinity;
        }
        let mut result = Point::Infinity;
        let mut addend = point.clone();
        let bits = scalar.bits();
        for i in 0..bits {
            if scalar.bit(i) {
                result = self.add(&result, &addend);
            }
            if i + 1 < bits {
                addend = self.add(&addend, &addend);
            }
        }
        result
    }
}

/// A curve together with a base point of prime order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// The underlying curve.
    pub curve: Curve,
    /// The base point `G`.
    pub generator: Point,
    /// The prime order of `G`, the modulus of all scalar arithmetic.
    pub order: BigUint,
}

impl Group {
    /// Bundles a curve, base point and order into a group handle.
    pub fn new(curve: Curve, generator: Point, order: BigUint) -> Self {
        Group {
            curve,
            generator,
            order,
        }
    }

    /// `scalar · G`.
    pub fn mul_generator(&self, scalar: &BigUint) -> Point {
        self.curve.mul(&self.generator, scalar)
    }

    /// Draws a uniform scalar from `[1, order)`.
    pub fn random_scalar<R: Rng + CryptoRng>(&self, rng: &mut R) -> BigUint {
        rng.gen_biguint_range(&BigUint::one(), &self.order)
    }

    /// Generates an ECC keypair `(d, d·G)`.
    pub fn generate_keypair<R: Rng + CryptoRng>(&self, rng: &mut R) -> (BigUint, Point) {
        let sk = self.random_scalar(rng);
        let pk = self.mul_generator(&sk);
        (sk, pk)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::SeedableRng as _;
    use rand_chacha::ChaCha12Rng;

    /// secp192r1, the curve the integration scenarios run on.
    pub(crate) fn p192() -> Group {
        let p = BigUint::parse_bytes(
            b"fffffffffffffffffffffffffffffffeffffffffffffffff",
            16,
        )
        .unwrap();
        let a = &p - 3u32;
        let b = BigUint::parse_bytes(
            b"64210519e59c80e70fa7e9ab72243049feb8deecc146b9b1",
            16,
        )
        .unwrap();
        let gx = BigUint::parse_bytes(
            b"188da80eb03090f67cbf20eb43a18800f4ff0afd82ff1012",
            16,
        )
        .unwrap();
        let gy = BigUint::parse_bytes(
            b"07192b95ffc8da78631011ed6b24cdd573f977a11e794811",
            16,
        )
        .unwrap();
        let order = BigUint::parse_bytes(
            b"ffffffffffffffffffffffff99def836146bc9b1b4d22831",
            16,
        )
        .unwrap();
        let curve = Curve::new(p, a, b);
        let generator = Point::affine(gx, gy);
        Group::new(curve, generator, order)
    }

    #[test]
    fn generator_is_on_curve() {
        let group = p192();
        assert!(group.curve.contains(&group.generator));
    }

    #[test]
    fn order_times_generator_is_infinity() {
        let group = p192();
        assert!(group.mul_generator(&group.order).is_infinity());
        assert!(group.mul_generator(&BigUint::zero()).is_infinity());
    }

    #[test]
    fn addition_matches_scalar_multiplication() {
        let group = p192();
        let two_g = group.curve.add(&group.generator, &group.generator);
        assert_eq!(two_g, group.mul_generator(&BigUint::from(2u32)));
        let three_g = group.curve.add(&two_g, &group.generator);
        assert_eq!(three_g, group.mul_generator(&BigUint::from(3u32)));
        assert!(group.curve.contains(&three_g));
    }

    #[test]
    fn subtraction_undoes_addition() {
        let group = p192();
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        let (_, p1) = group.generate_keypair(&mut rng);
        let (_, p2) = group.generate_keypair(&mut rng);
        let sum = group.curve.add(&p1, &p2);
        assert_eq!(group.curve.sub(&sum, &p2), p1);
        let diff = group.curve.sub(&p1, &p1);
        assert!(diff.is_infinity());
    }

    #[test]
    fn y_candidates_square_to_rhs() {
        let group = p192();
        let gx = group.generator.x().unwrap().clone();
        let (y0, y1) = group.curve.y_candidates(&gx).expect("Gx has a residue");
        let gy = group.generator.y().unwrap();
        assert!(&y0 == gy || &y1 == gy);
    }

    #[test]
    fn point_serde_round_trip() {
        let group = p192();
        let json = serde_json::to_string(&group.generator).unwrap();
        let back: Point = serde_json::from_str(&json).unwrap();
        assert_eq!(back, group.generator);

        let inf = serde_json::to_string(&Point::Infinity).unwrap();
        assert_eq!(inf, "null");
        let back: Point = serde_json::from_str(&inf).unwrap();
        assert!(back.is_infinity());
    }
}
