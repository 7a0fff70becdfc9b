//! Canonical wire representation of big integers.
//!
//! Integers wider than native 64-bit are exchanged as uppercase hexadecimal
//! strings, zero-padded to at least 48 characters and grouped in 8-character
//! chunks separated by single spaces (`"CAFEBABE DEADBEEF …"`). This module is
//! the single place that owns the conversion; serde helpers are provided so
//! request/response types can annotate fields instead of converting by hand.

use num_bigint::BigUint;
use num_traits::Zero;

/// Chunk width of the grouped representation.
const GROUP: usize = 8;
/// Minimum width (in hex characters) values are padded to.
const PAD: usize = 48;

/// Error returned when a wire string cannot be parsed back into an integer.
#[derive(Debug, thiserror::Error)]
#[error("invalid hex integer: {0:?}")]
pub struct ParseIntError(pub String);

/// Formats a big integer as grouped, zero-padded uppercase hex.
pub fn int_to_hex(value: &BigUint) -> String {
    let mut digits = format!("{value:X}");
    if digits.len() < PAD {
        digits = format!("{}{digits}", "0".repeat(PAD - digits.len()));
    }
    digits
        .as_bytes()
        .chunks(GROUP)
        .map(|chunk| std::str::from_utf8(chunk).expect("hex digits are ascii"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a grouped hex string (spaces and an optional `0x` prefix are
/// accepted) back into a big integer. An empty string parses as zero.
pub fn hex_to_int(text: &str) -> Result<BigUint, ParseIntError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = compact
        .strip_prefix("0x")
        .or_else(|| compact.strip_prefix("0X"))
        .unwrap_or(&compact);
    if digits.is_empty() {
        return Ok(BigUint::zero());
    }
    BigUint::parse_bytes(digits.as_bytes(), 16).ok_or_else(|| ParseIntError(text.to_owned()))
}

/// Serde adapter for [`BigUint`] fields in wire types.
pub mod hexint {
    use super::*;
    use serde::{Deserialize as _, Deserializer, Serializer, de::Error as _};

    /// Serializes a [`BigUint`] as grouped uppercase hex.
    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&int_to_hex(value))
    }

    /// Deserializes a grouped uppercase hex string into a [`BigUint`].
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex_to_int(&text).map_err(D::Error::custom)
    }
}

/// Serde adapter for `Option<BigUint>` fields in wire types.
pub mod opt_hexint {
    use super::*;
    use serde::{Deserialize as _, Deserializer, Serializer, de::Error as _};

    /// Serializes an optional [`BigUint`] as grouped uppercase hex or `null`.
    pub fn serialize<S: Serializer>(
        value: &Option<BigUint>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_some(&int_to_hex(value)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes an optional grouped hex string.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<BigUint>, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?;
        text.map(|t| hex_to_int(&t).map_err(D::Error::custom))
            .transpose()
    }
}
