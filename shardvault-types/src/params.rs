//! The system parameter document.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use shardvault_core::codec::hexint;
use shardvault_core::curve::{Curve, Group, Point};

/// Immutable system parameters, created once by the coordinator and served
/// to every joining node and client via `GET /system/parameters`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemParameters {
    /// Coordinator instance id; doubles as the SM2 signer identity.
    #[serde(rename = "_id")]
    pub id: String,
    /// Identifier of the named curve the parameters came from.
    #[serde(default)]
    pub curve: String,
    /// Number of storage nodes the deployment targets.
    pub n: u32,
    /// Reconstruction threshold, `2 ≤ t ≤ n`.
    pub t: u32,
    /// Curve prime `p`.
    #[serde(with = "hexint")]
    pub p: BigUint,
    /// Curve coefficient `a`, reduced modulo `p`.
    #[serde(with = "hexint")]
    pub a: BigUint,
    /// Curve coefficient `b`.
    #[serde(with = "hexint")]
    pub b: BigUint,
    /// Base point x-coordinate.
    #[serde(rename = "Gx", with = "hexint")]
    pub gx: BigUint,
    /// Base point y-coordinate.
    #[serde(rename = "Gy", with = "hexint")]
    pub gy: BigUint,
    /// Prime order of the base point; the modulus of all share arithmetic.
    #[serde(rename = "N", with = "hexint")]
    pub order: BigUint,
    /// Hash algorithm identifier (`"sha256"`).
    #[serde(rename = "H")]
    pub hash: String,
    /// The coordinator's SM2 public key, present once generated.
    #[serde(rename = "SM2_PublicKey", default, skip_serializing_if = "Option::is_none")]
    pub sm2_public_key: Option<Point>,
}

impl SystemParameters {
    /// The curve described by these parameters.
    pub fn curve(&self) -> Curve {
        Curve::new(self.p.clone(), self.a.clone(), self.b.clone())
    }

    /// The group (curve, base point, order) described by these parameters.
    pub fn group(&self) -> Group {
        Group::new(
            self.curve(),
            Point::affine(self.gx.clone(), self.gy.clone()),
            self.order.clone(),
        )
    }
}

/// Raw parameters of a named curve.
#[derive(Debug, Clone)]
pub struct CurveParameters {
    /// Curve prime.
    pub p: BigUint,
    /// Coefficient `a`, reduced modulo `p`.
    pub a: BigUint,
    /// Coefficient `b`.
    pub b: BigUint,
    /// Base point x-coordinate.
    pub gx: BigUint,
    /// Base point y-coordinate.
    pub gy: BigUint,
    /// Prime order of the base point.
    pub order: BigUint,
}

impl CurveParameters {
    /// Looks up the parameters of a named curve (`secp192r1`, `secp256k1`).
    pub fn named(curve: &str) -> Option<CurveParameters> {
        let hex = |s: &[u8]| BigUint::parse_bytes(s, 16).expect("curve constant");
        match curve {
            "secp192r1" => {
                let p = hex(b"fffffffffffffffffffffffffffffffeffffffffffffffff");
                Some(CurveParameters {
                    a: &p - 3u32,
                    p,
                    b: hex(b"64210519e59c80e70fa7e9ab72243049feb8deecc146b9b1"),
                    gx: hex(b"188da80eb03090f67cbf20eb43a18800f4ff0afd82ff1012"),
                    gy: hex(b"07192b95ffc8da78631011ed6b24cdd573f977a11e794811"),
                    order: hex(b"ffffffffffffffffffffffff99def836146bc9b1b4d22831"),
                })
            }
            "secp256k1" => Some(CurveParameters {
                p: hex(b"fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2f"),
                a: BigUint::from(0u32),
                b: BigUint::from(7u32),
                gx: hex(b"79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"),
                gy: hex(b"483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8"),
                order: hex(b"fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141"),
            }),
            _ => None,
        }
    }
}
