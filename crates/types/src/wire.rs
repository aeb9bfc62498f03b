//! JSON conventions shared by the cache server and its clients.
//!
//! 128-bit amounts travel as decimal strings with a trailing `n`
//! (`"100000n"`), arbitrary-precision stakes as plain decimal strings. Both are
//! parsed straight back into integers; nothing goes through `f64`.

use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serializer};
use std::str::FromStr;

/// Suffix marking an integer that must not be read as a JSON number.
pub const BIG_INT_SUFFIX: char = 'n';

pub fn encode_u128(value: u128) -> String {
    format!("{value}{BIG_INT_SUFFIX}")
}

/// Parse a `"<digits>n"` string. Anything else, including a bare number, is
/// rejected.
pub fn decode_u128(value: &str) -> Result<u128, String> {
    let digits = value
        .strip_suffix(BIG_INT_SUFFIX)
        .ok_or_else(|| format!("expected n-suffixed integer, got {value:?}"))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid n-suffixed integer {value:?}"));
    }
    u128::from_str(digits).map_err(|err| format!("invalid n-suffixed integer {value:?}: {err}"))
}

/// `#[serde(with = "wire::n_suffixed")]` for `u128` fields.
pub mod n_suffixed {
    use super::*;

    pub fn serialize<S>(value: &u128, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&encode_u128(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u128, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        decode_u128(&raw).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "wire::decimal_string")]` for `BigUint` fields.
pub mod decimal_string {
    use super::*;

    pub fn serialize<S>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        BigUint::parse_bytes(raw.as_bytes(), 10)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid decimal integer {raw:?}")))
    }
}
