//! Opaque vendor metadata.
//!
//! Vendors attach auxiliary data to a turn (reasoning text, thought
//! signatures, signed thinking blocks) that must come back on a later request
//! exactly as it was received. Values are held as the raw JSON text the vendor
//! sent, so nothing here can re-encode them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;

/// A JSON value kept as the exact byte sequence it was parsed from.
#[derive(Clone)]
pub struct RawJson(Box<RawValue>);

impl RawJson {
    /// Wrap already-serialized JSON text. Fails if the text is not valid JSON.
    pub fn from_raw(text: impl Into<String>) -> Result<Self, serde_json::Error> {
        RawValue::from_string(text.into()).map(Self)
    }

    /// Serialize a value into a fresh raw value.
    pub fn from_value<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::value::to_raw_value(value).map(Self)
    }

    /// The exact JSON text.
    pub fn as_str(&self) -> &str {
        self.0.get()
    }

    pub fn as_raw(&self) -> &RawValue {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.get().is_empty()
    }
}

impl From<Box<RawValue>> for RawJson {
    fn from(raw: Box<RawValue>) -> Self {
        Self(raw)
    }
}

impl PartialEq for RawJson {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for RawJson {}

impl fmt::Debug for RawJson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RawJson {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RawJson {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Box::<RawValue>::deserialize(deserializer).map(Self)
    }
}

/// Vendor fields captured from one response, keyed by stable internal keys.
///
/// `provider` is the id of the profile whose extraction table produced the
/// fields; nothing is ever sent to a different provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueMetadata {
    pub provider: String,
    pub fields: BTreeMap<String, RawJson>,
}

impl OpaqueMetadata {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: RawJson) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: RawJson) {
        self.fields.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&RawJson> {
        self.fields.get(key)
    }

    pub fn is_from(&self, provider: &str) -> bool {
        self.provider == provider
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Byte length of all raw values, used for token estimation.
    pub fn raw_len(&self) -> usize {
        self.fields.values().map(RawJson::len).sum()
    }
}
