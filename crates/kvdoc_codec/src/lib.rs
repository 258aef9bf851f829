//! # kvdoc Codec
//!
//! Dynamic record values and the blob format for kvdoc.
//!
//! Records are attribute bags whose shape is only known at runtime, from
//! the collection schema. This crate provides:
//! - [`Value`], the tagged union every attribute holds
//! - [`Record`], an attribute-name-ordered map of values
//! - JSON encoding/decoding of record blobs
//! - date parsing for attributes declared `date`, `time` or `datetime`
//!
//! ## Blob Rules
//!
//! - A blob is a single JSON object
//! - Integers stay JSON integers; floats are JSON numbers
//! - Dates are RFC 3339 text with millisecond precision and a `Z` suffix
//! - Non-finite floats are written as `null`
//!
//! ## Usage
//!
//! ```
//! use kvdoc_codec::{decode_record, encode_record, Record, Value};
//!
//! let mut record = Record::new();
//! record.insert("id".into(), Value::Integer(1));
//! record.insert("name".into(), Value::from("Darth Vader"));
//!
//! let blob = encode_record(&record).unwrap();
//! assert_eq!(blob, r#"{"id":1,"name":"Darth Vader"}"#);
//! assert_eq!(decode_record(&blob).unwrap(), record);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod record;
mod temporal;
mod value;

pub use error::{CodecError, CodecResult};
pub use record::{decode_record, encode_record, record_from_json, record_to_json, Record};
pub use temporal::parse_datetime;
pub use value::Value;
