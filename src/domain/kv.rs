//! String key/value maps for registration metadata and status blobs.
//!
//! Clients send these maps in one of three shapes, all accepted by
//! [`KvPayload`]:
//!
//! - a JSON object: `{"foo": "bar"}`
//! - ordered pairs: `[["foo", "bar"], ["foo", "baz"]]`
//! - the packed C-client form: `"foo\u0000bar\u0000this\u0000that\u0000"`
//!
//! In every shape a repeated key overwrites the earlier value, in the
//! order the client sent them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Ordered string map used for both metadata and status.
pub type KvMap = BTreeMap<String, String>;

/// Builds a [`KvMap`] from pairs; later duplicates win.
pub fn from_pairs<I, K, V>(pairs: I) -> KvMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut map = KvMap::new();
    for (k, v) in pairs {
        map.insert(k.into(), v.into());
    }
    map
}

/// Parses the packed NUL-separated form `k1\0v1\0k2\0v2\0`.
///
/// Parsing stops at the first empty key, so a trailing terminator (or a
/// double NUL) ends the list.
///
/// # Errors
///
/// Returns [`RegistryError::InvalidRequest`] if a key has no value.
pub fn parse_packed(packed: &str) -> Result<KvMap, RegistryError> {
    let mut map = KvMap::new();
    let mut fields = packed.split('\0');
    while let Some(key) = fields.next() {
        if key.is_empty() {
            break;
        }
        let Some(value) = fields.next() else {
            return Err(RegistryError::InvalidRequest(format!(
                "packed key/value list: key {key:?} has no value"
            )));
        };
        map.insert(key.to_string(), value.to_string());
    }
    Ok(map)
}

/// Wire shape of a metadata or status payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KvPayload {
    /// Packed NUL-separated string.
    Packed(String),
    /// Ordered `[key, value]` pairs.
    Pairs(Vec<[String; 2]>),
    /// Plain JSON object.
    Map(KvMap),
}

impl KvPayload {
    /// Normalizes the payload into a [`KvMap`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidRequest`] if a packed string is
    /// malformed.
    pub fn into_map(self) -> Result<KvMap, RegistryError> {
        match self {
            Self::Packed(packed) => parse_packed(&packed),
            Self::Pairs(pairs) => Ok(from_pairs(pairs.into_iter().map(|[k, v]| (k, v)))),
            Self::Map(map) => Ok(map),
        }
    }
}

impl Default for KvPayload {
    fn default() -> Self {
        Self::Map(KvMap::new())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn packed_metadata_from_c_client() {
        let Ok(map) = parse_packed("foo\0bar\0this\0that\0") else {
            panic!("valid packed list");
        };
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("foo").map(String::as_str), Some("bar"));
        assert_eq!(map.get("this").map(String::as_str), Some("that"));
    }

    #[test]
    fn packed_stops_at_empty_key() {
        let Ok(map) = parse_packed("a\0b\0\0ignored\0x\0") else {
            panic!("valid packed list");
        };
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn packed_without_value_is_rejected() {
        let result = parse_packed("testing\0testing\0count");
        assert!(matches!(result, Err(RegistryError::InvalidRequest(_))));
    }

    #[test]
    fn empty_packed_is_empty_map() {
        let Ok(map) = parse_packed("") else {
            panic!("empty list is valid");
        };
        assert!(map.is_empty());
    }

    #[test]
    fn later_duplicates_overwrite() {
        let map = from_pairs([("count", "0"), ("count", "1"), ("testing", "running")]);
        assert_eq!(map.get("count").map(String::as_str), Some("1"));
        assert_eq!(map.len(), 2);

        let Ok(packed) = parse_packed("k\0first\0k\0second\0") else {
            panic!("valid packed list");
        };
        assert_eq!(packed.get("k").map(String::as_str), Some("second"));
    }

    #[test]
    fn payload_shapes_deserialize() {
        let object: KvPayload = serde_json::from_str(r#"{"foo":"bar"}"#)
            .unwrap_or_else(|_| panic!("object payload"));
        assert!(matches!(object, KvPayload::Map(_)));

        let pairs: KvPayload = serde_json::from_str(r#"[["count","0"],["count","7"]]"#)
            .unwrap_or_else(|_| panic!("pairs payload"));
        let Ok(map) = pairs.into_map() else {
            panic!("pairs normalize");
        };
        assert_eq!(map.get("count").map(String::as_str), Some("7"));

        let packed: KvPayload = serde_json::from_str(r#""foo\u0000bar\u0000""#)
            .unwrap_or_else(|_| panic!("packed payload"));
        assert!(matches!(packed, KvPayload::Packed(_)));
    }
}
