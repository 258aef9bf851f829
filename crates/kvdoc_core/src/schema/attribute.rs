//! Attribute descriptors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    /// Short string.
    String,
    /// Long text.
    Text,
    /// Integer number.
    Integer,
    /// Floating point number.
    Float,
    /// Any number.
    Number,
    /// Boolean.
    Boolean,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    Datetime,
    /// Free-form JSON.
    Json,
    /// Array of values.
    Array,
    /// Binary payload.
    Binary,
    /// Any type name not listed above.
    #[default]
    #[serde(other)]
    Unknown,
}

impl AttributeType {
    /// Returns true for `date`, `time` and `datetime`.
    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            AttributeType::Date | AttributeType::Time | AttributeType::Datetime
        )
    }
}

/// Descriptor of one attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Declared type.
    #[serde(rename = "type", default)]
    pub kind: AttributeType,
    /// Whether this attribute is the primary key.
    #[serde(rename = "primaryKey", default)]
    pub primary_key: bool,
    /// Whether values must be unique across the collection.
    #[serde(default)]
    pub unique: bool,
    /// Whether values come from a sequence.
    #[serde(rename = "autoIncrement", default)]
    pub auto_increment: bool,
}

impl Attribute {
    /// Creates a descriptor of the given type with no flags.
    pub fn new(kind: AttributeType) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Marks the attribute as the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Marks the attribute unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the attribute auto-incrementing.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }
}

/// Attribute name to descriptor.
pub type AttributeSchema = BTreeMap<String, Attribute>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserialize_definition_format() {
        let schema: AttributeSchema = serde_json::from_value(json!({
            "id": {"type": "integer", "primaryKey": true, "autoIncrement": true},
            "email": {"type": "string", "unique": true},
            "born": {"type": "datetime"},
            "blob": {"type": "mystery"},
            "loose": {}
        }))
        .unwrap();

        assert!(schema["id"].primary_key);
        assert!(schema["id"].auto_increment);
        assert!(!schema["id"].unique);
        assert!(schema["email"].unique);
        assert!(schema["born"].kind.is_temporal());
        assert_eq!(schema["blob"].kind, AttributeType::Unknown);
        assert_eq!(schema["loose"], Attribute::default());
    }

    #[test]
    fn temporal_types() {
        assert!(AttributeType::Date.is_temporal());
        assert!(AttributeType::Time.is_temporal());
        assert!(!AttributeType::String.is_temporal());
    }

    #[test]
    fn builder_flags() {
        let attr = Attribute::new(AttributeType::Integer)
            .primary_key()
            .auto_increment();
        assert!(attr.primary_key && attr.auto_increment && !attr.unique);
    }
}
