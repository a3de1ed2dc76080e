//! `serde` helpers for encoding [`BigUint`] values as hex strings, shared
//! by the scheme and share types.

use num_bigint::BigUint;

pub mod biguint {
    use super::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_str_radix(16))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BigUint, D::Error> {
        let raw = String::deserialize(d)?;
        BigUint::parse_bytes(raw.as_bytes(), 16)
            .ok_or_else(|| serde::de::Error::custom("invalid hex BigUint"))
    }
}

pub mod biguint_opt {
    use super::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<BigUint>, s: S) -> Result<S::Ok, S::Error> {
        value.as_ref().map(|v| v.to_str_radix(16)).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<BigUint>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|s| {
            BigUint::parse_bytes(s.as_bytes(), 16)
                .ok_or_else(|| serde::de::Error::custom("invalid hex BigUint"))
        })
        .transpose()
    }
}

pub mod biguint_vec_opt {
    use super::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<BigUint>>, s: S) -> Result<S::Ok, S::Error> {
        value
            .as_ref()
            .map(|vs| vs.iter().map(|v| v.to_str_radix(16)).collect::<Vec<_>>())
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<BigUint>>, D::Error> {
        let raw: Option<Vec<String>> = Option::deserialize(d)?;
        raw.map(|vs| {
            vs.into_iter()
                .map(|s| {
                    BigUint::parse_bytes(s.as_bytes(), 16)
                        .ok_or_else(|| serde::de::Error::custom("invalid hex BigUint"))
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()
    }
}
