//! Query criteria.
//!
//! A [`Criteria`] combines a [`Filter`] tree with sorting, pagination,
//! projection, aggregate directives and join instructions. Criteria are
//! usually parsed from JSON with [`Criteria::from_json`], but can also be
//! built directly.
//!
//! ```rust
//! use kvdoc_core::criteria::{Criteria, Filter, Predicate, SortDirection};
//!
//! let criteria = Criteria::new()
//!     .filter(Filter::attr("age", Predicate::Compare(
//!         kvdoc_core::criteria::CmpOp::Gt,
//!         18.into(),
//!     )))
//!     .sort_by("name", SortDirection::Asc)
//!     .limit(10);
//! assert_eq!(criteria.limit, Some(10));
//! ```

mod evaluator;
mod parse;

pub use evaluator::{CriteriaEvaluator, PredicateEvaluator};

use kvdoc_codec::Value;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
}

/// A condition on a single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Equal to the operand. Text compares case-insensitively.
    Eq(Value),
    /// Equal to any of the operands.
    In(Vec<Value>),
    /// Null or absent.
    IsNull,
    /// Negation.
    Not(Box<Predicate>),
    /// Ordered comparison against the operand.
    Compare(CmpOp, Value),
    /// Text prefix, case-insensitive.
    StartsWith(String),
    /// Text suffix, case-insensitive.
    EndsWith(String),
    /// Text substring, case-insensitive.
    Contains(String),
    /// Pattern with `%` wildcards, case-insensitive.
    Like(String),
}

/// A filter tree over records.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// Matches every record.
    #[default]
    All,
    /// Matches when every child matches.
    And(Vec<Filter>),
    /// Matches when any child matches.
    Or(Vec<Filter>),
    /// A predicate on one attribute.
    Attr {
        /// Attribute name.
        attribute: String,
        /// Condition on its value.
        predicate: Predicate,
    },
}

impl Filter {
    /// Creates an attribute filter.
    pub fn attr(attribute: impl Into<String>, predicate: Predicate) -> Self {
        Filter::Attr {
            attribute: attribute.into(),
            predicate,
        }
    }

    /// Creates an equality filter.
    pub fn eq(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::attr(attribute, Predicate::Eq(value.into()))
    }

    /// Returns true if the filter matches everything.
    pub fn is_all(&self) -> bool {
        match self {
            Filter::All => true,
            Filter::And(children) => children.iter().all(Filter::is_all),
            _ => false,
        }
    }

    /// Returns the operand if the whole filter is one equality on `attribute`
    /// against a non-null scalar.
    pub fn single_eq(&self, attribute: &str) -> Option<&Value> {
        match self {
            Filter::Attr {
                attribute: name,
                predicate: Predicate::Eq(value),
            } if name == attribute && is_scalar(value) => Some(value),
            Filter::And(children) if children.len() == 1 => children[0].single_eq(attribute),
            _ => None,
        }
    }

    /// Returns the operand of a top-level equality on `attribute`, looking
    /// through conjunctions.
    pub fn pinned(&self, attribute: &str) -> Option<&Value> {
        match self {
            Filter::Attr {
                attribute: name,
                predicate: Predicate::Eq(value),
            } if name == attribute => Some(value),
            Filter::And(children) => children.iter().find_map(|c| c.pinned(attribute)),
            _ => None,
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Array(_) | Value::Object(_))
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Attribute to sort by.
    pub attribute: String,
    /// Direction.
    pub direction: SortDirection,
}

/// Aggregate directives applied after filtering and pagination.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AggregateOptions {
    /// Attributes to group by.
    pub group_by: Vec<String>,
    /// Attributes to sum.
    pub sum: Vec<String>,
    /// Attributes to average.
    pub average: Vec<String>,
    /// Attributes to take the minimum of.
    pub min: Vec<String>,
    /// Attributes to take the maximum of.
    pub max: Vec<String>,
}

impl AggregateOptions {
    /// Returns true if any calculation is requested.
    pub fn has_calculation(&self) -> bool {
        !(self.sum.is_empty()
            && self.average.is_empty()
            && self.min.is_empty()
            && self.max.is_empty())
    }

    /// Returns true if no directive is present.
    pub fn is_empty(&self) -> bool {
        self.group_by.is_empty() && !self.has_calculation()
    }
}

/// A parsed query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Criteria {
    /// Record filter.
    pub filter: Filter,
    /// Sort keys, most significant first.
    pub sort: Vec<SortKey>,
    /// Records to skip after sorting.
    pub skip: Option<usize>,
    /// Maximum number of records after skipping.
    pub limit: Option<usize>,
    /// Aggregate directives.
    pub aggregate: AggregateOptions,
    /// Attribute projection. Empty selects everything.
    pub select: Vec<String>,
    /// Join instructions, passed to the join runner untouched.
    pub joins: Option<serde_json::Value>,
}

impl Criteria {
    /// Creates criteria matching every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates criteria with a single equality.
    pub fn where_eq(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().filter(Filter::eq(attribute, value))
    }

    /// Sets the filter.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Appends a sort key.
    #[must_use]
    pub fn sort_by(mut self, attribute: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(SortKey {
            attribute: attribute.into(),
            direction,
        });
        self
    }

    /// Sets the skip count.
    #[must_use]
    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Sets the limit.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the aggregate directives.
    #[must_use]
    pub fn aggregate(mut self, aggregate: AggregateOptions) -> Self {
        self.aggregate = aggregate;
        self
    }

    /// Sets the projection.
    #[must_use]
    pub fn select<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Copy holding only the filter.
    pub fn where_only(&self) -> Self {
        Self::new().filter(self.filter.clone())
    }

    /// Copy holding everything except the filter and aggregates.
    pub fn without_where(&self) -> Self {
        Self {
            filter: Filter::All,
            sort: self.sort.clone(),
            skip: self.skip,
            limit: self.limit,
            aggregate: AggregateOptions::default(),
            select: Vec::new(),
            joins: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_eq_detects_primary_key_lookup() {
        let filter = Filter::eq("id", 3);
        assert_eq!(filter.single_eq("id"), Some(&Value::Integer(3)));
        assert_eq!(filter.single_eq("name"), None);

        let wrapped = Filter::And(vec![Filter::eq("id", 3)]);
        assert_eq!(wrapped.single_eq("id"), Some(&Value::Integer(3)));

        let null = Filter::eq("id", Value::Null);
        assert_eq!(null.single_eq("id"), None);

        let two = Filter::And(vec![Filter::eq("id", 3), Filter::eq("name", "x")]);
        assert_eq!(two.single_eq("id"), None);
        assert_eq!(two.pinned("id"), Some(&Value::Integer(3)));
    }

    #[test]
    fn aggregate_options_flags() {
        let mut opts = AggregateOptions::default();
        assert!(opts.is_empty());
        opts.group_by.push("type".into());
        assert!(!opts.is_empty());
        assert!(!opts.has_calculation());
        opts.sum.push("age".into());
        assert!(opts.has_calculation());
    }

    #[test]
    fn without_where_keeps_pagination() {
        let criteria = Criteria::where_eq("name", "a").skip(1).limit(2);
        let rest = criteria.without_where();
        assert!(rest.filter.is_all());
        assert_eq!((rest.skip, rest.limit), (Some(1), Some(2)));
        assert_eq!(criteria.where_only().limit, None);
    }
}
