//! Collection schemas and the key-value structures derived from them.
//!
//! A registered collection owns three kinds of auxiliary keys besides its
//! record blobs: the primary index set, one [`UniqueIndex`] set per unique
//! attribute and one [`Sequence`] counter per auto-increment attribute.

mod attribute;
mod registry;
mod sequence;
mod unique;

pub use attribute::{Attribute, AttributeSchema, AttributeType};
pub use registry::{CollectionSchema, SchemaRegistry};
pub use sequence::Sequence;
pub use unique::UniqueIndex;
