//! Deterministic key naming.
//!
//! Every key a collection owns starts with `{prefix}:{{collection}}:`. The
//! braces make the collection name a cluster hash tag, so all keys of one
//! collection land in the same slot and can share an atomic batch.
//!
//! | key | layout |
//! |---|---|
//! | primary index | `{prefix}:{{collection}}:{pk}` |
//! | record blob | `{prefix}:{{collection}}:{pk}:{value}` |
//! | unique index | `{prefix}:{{collection}}:_indices:{attr}` |
//! | sequence | `{prefix}:{{collection}}:_sequences:{attr}` |

use kvdoc_codec::Value;

/// Replaces every run of whitespace with a single underscore.
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_space = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

/// Renders a value the way it appears inside key names and index sets.
pub fn key_fragment(value: &Value) -> String {
    match value {
        Value::Text(text) => sanitize(text),
        other => sanitize(&other.to_string()),
    }
}

/// Renders a value as a member of a unique index set.
///
/// Unlike [`key_fragment`] the text is kept verbatim, so `"a b"` and
/// `"a_b"` are distinct values.
pub fn unique_member(value: &Value) -> String {
    match value {
        Value::Text(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Builds key names for one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    prefix: String,
}

impl KeyBuilder {
    /// Creates a key builder for the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns the prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn base(&self, collection: &str) -> String {
        format!("{}:{{{}}}", self.prefix, collection.to_lowercase())
    }

    /// Key of the set holding every record key of a collection.
    pub fn index_key(&self, collection: &str, primary_key: &str) -> String {
        format!("{}:{}", self.base(collection), primary_key)
    }

    /// Key of one record blob.
    pub fn record_key(&self, collection: &str, primary_key: &str, value: &Value) -> String {
        format!(
            "{}:{}",
            self.index_key(collection, primary_key),
            key_fragment(value)
        )
    }

    /// Key of the set of in-use values of a unique attribute.
    pub fn unique_index_key(&self, collection: &str, attribute: &str) -> String {
        format!("{}:_indices:{}", self.base(collection), sanitize(attribute))
    }

    /// Key of the counter backing an auto-increment attribute.
    pub fn sequence_key(&self, collection: &str, attribute: &str) -> String {
        format!("{}:_sequences:{}", self.base(collection), sanitize(attribute))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_collapses_whitespace_runs() {
        assert_eq!(sanitize("Darth  Vader"), "Darth_Vader");
        assert_eq!(sanitize(" a\tb\n"), "_a_b_");
        assert_eq!(sanitize("plain"), "plain");
    }

    #[test]
    fn key_layout() {
        let keys = KeyBuilder::new("app");
        assert_eq!(keys.index_key("Users", "id"), "app:{users}:id");
        assert_eq!(
            keys.record_key("users", "id", &Value::Integer(1)),
            "app:{users}:id:1"
        );
        assert_eq!(
            keys.unique_index_key("users", "email"),
            "app:{users}:_indices:email"
        );
        assert_eq!(keys.sequence_key("users", "id"), "app:{users}:_sequences:id");
    }

    #[test]
    fn record_key_sanitizes_text_values() {
        let keys = KeyBuilder::new("app");
        assert_eq!(
            keys.record_key("users", "name", &Value::from("Han  Solo")),
            "app:{users}:name:Han_Solo"
        );
    }

    #[test]
    fn fragments_of_non_text_values() {
        assert_eq!(key_fragment(&Value::Float(2.0)), "2");
        assert_eq!(key_fragment(&Value::Bool(true)), "true");
    }

    #[test]
    fn unique_members_keep_whitespace() {
        assert_eq!(unique_member(&Value::from("a  b")), "a  b");
        assert_ne!(
            unique_member(&Value::from("a b")),
            unique_member(&Value::from("a_b"))
        );
        assert_eq!(unique_member(&Value::Float(2.0)), "2");
    }

    #[test]
    fn prefixes_do_not_collide() {
        let a = KeyBuilder::new("a");
        let b = KeyBuilder::new("b");
        assert_ne!(a.index_key("users", "id"), b.index_key("users", "id"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn sanitized_fragments_have_no_whitespace(s in "\\PC*") {
            let out = sanitize(&s);
            prop_assert!(!out.chars().any(char::is_whitespace));
        }

        #[test]
        fn sanitize_is_idempotent(s in "\\PC*") {
            let once = sanitize(&s);
            prop_assert_eq!(sanitize(&once), once);
        }
    }
}
