use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};


pub fn option_is_empty<T>(value: &Option<T>) -> bool {
    value.is_none()
}

pub fn vec_is_empty<T>(v: &Vec<T>) -> bool {
    v.is_empty()
}

/// Accepts either a single string or a list of strings.
pub fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

/// Reads a value of the expected shape, anything else reads as absent.
///
/// Request fields go through this so that a mistyped field surfaces as the
/// business error for a missing value instead of a decoding failure.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire<U> {
        Value(U),
        Other(IgnoredAny),
    }

    Ok(match Wire::<T>::deserialize(deserializer)? {
        Wire::Value(value) => Some(value),
        Wire::Other(_) => None,
    })
}

/// Like [`lenient`], falling back to `T::default()`.
pub fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

/// Integer field that SOAP-minded clients may also send as a decimal string.
pub fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Int(i64),
        Text(String),
        Other(IgnoredAny),
    }

    Ok(match Wire::deserialize(deserializer)? {
        Wire::Int(value) => Some(value),
        Wire::Text(text) => text.trim().parse().ok(),
        Wire::Other(_) => None,
    })
}
