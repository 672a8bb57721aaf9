/// Serde helper functions for custom serialization/deserialization
use serde::{Deserialize, Deserializer};

/// Skip serializing if bool is false
pub fn is_false(value: &bool) -> bool {
    !*value
}

/// Skip serializing if Vec is empty
pub fn is_empty_vec<T>(value: &Vec<T>) -> bool {
    value.is_empty()
}

/// Serde default for flags that are on unless stated otherwise
pub fn default_true() -> bool {
    true
}

/// Accept either a single string or a list of strings
///
/// Package manifests write `"mime": "text/plain"` as often as
/// `"mime": ["text/plain"]`.
pub fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
        None => Vec::new(),
    })
}
