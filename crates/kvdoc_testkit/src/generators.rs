//! Property-based test generators using proptest.
//!
//! Provides strategies for generating collection names, attribute values and
//! sequences of write operations against the `users` fixture schema.

use kvdoc_codec::Value;
use proptest::prelude::*;

/// Strategy for generating valid collection names.
pub fn collection_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for short text that may contain whitespace runs.
pub fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,6}( {1,2}[a-z]{1,6}){0,2}").expect("Invalid regex")
}

/// Strategy for email addresses drawn from a small pool, so collisions are
/// frequent.
pub fn email_strategy() -> impl Strategy<Value = String> {
    (0u8..6).prop_map(|n| format!("user{n}@example.com"))
}

/// Strategy for scalar attribute values.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| Value::Integer(i64::from(n))),
        (-1.0e6..1.0e6f64).prop_map(Value::Float),
        text_strategy().prop_map(Value::Text),
    ]
}

/// A write against the `users` fixture collection.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Create a user.
    Create {
        /// Unique email.
        email: String,
        /// Display name.
        name: String,
    },
    /// Change the email of the `index`-th existing user (modulo count).
    UpdateEmail {
        /// Which user.
        index: usize,
        /// The new email.
        email: String,
    },
    /// Destroy the `index`-th existing user (modulo count).
    Destroy {
        /// Which user.
        index: usize,
    },
}

/// Strategy for a single write operation.
pub fn write_op_strategy() -> impl Strategy<Value = WriteOp> {
    prop_oneof![
        3 => (email_strategy(), text_strategy())
            .prop_map(|(email, name)| WriteOp::Create { email, name }),
        2 => (any::<usize>(), email_strategy())
            .prop_map(|(index, email)| WriteOp::UpdateEmail { index, email }),
        1 => any::<usize>().prop_map(|index| WriteOp::Destroy { index }),
    ]
}

/// Strategy for a sequence of write operations.
pub fn write_ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<WriteOp>> {
    prop::collection::vec(write_op_strategy(), 1..max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn collection_names_are_valid(name in collection_name_strategy()) {
            prop_assert!(!name.is_empty());
            prop_assert!(name.len() <= 16);
        }

        #[test]
        fn emails_come_from_the_pool(email in email_strategy()) {
            prop_assert!(email.starts_with("user"));
            prop_assert!(email.ends_with("@example.com"));
        }
    }
}
