//! Criteria evaluation over in-memory records.

use super::{CmpOp, Criteria, Filter, Predicate, SortDirection};
use crate::error::CoreResult;
use kvdoc_codec::{parse_datetime, Record, Value};
use std::cmp::Ordering;
use std::fmt::Debug;

/// Applies criteria to a set of records.
///
/// Implementations filter, then sort, then skip and limit. Aggregates and
/// projection are not their concern.
pub trait CriteriaEvaluator: Debug + Send + Sync {
    /// Evaluates `criteria` against `records`.
    fn evaluate(&self, records: Vec<Record>, criteria: &Criteria) -> CoreResult<Vec<Record>>;
}

/// The default evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PredicateEvaluator;

impl PredicateEvaluator {
    /// Creates the evaluator.
    pub fn new() -> Self {
        Self
    }

    /// Tests one record against a filter.
    pub fn matches(&self, record: &Record, filter: &Filter) -> bool {
        match filter {
            Filter::All => true,
            Filter::And(children) => children.iter().all(|c| self.matches(record, c)),
            Filter::Or(children) => children.iter().any(|c| self.matches(record, c)),
            Filter::Attr {
                attribute,
                predicate,
            } => {
                let value = record.get(attribute).unwrap_or(&Value::Null);
                test(value, predicate)
            }
        }
    }
}

impl CriteriaEvaluator for PredicateEvaluator {
    fn evaluate(&self, records: Vec<Record>, criteria: &Criteria) -> CoreResult<Vec<Record>> {
        let mut records: Vec<Record> = if criteria.filter.is_all() {
            records
        } else {
            records
                .into_iter()
                .filter(|r| self.matches(r, &criteria.filter))
                .collect()
        };

        if !criteria.sort.is_empty() {
            records.sort_by(|a, b| {
                for key in &criteria.sort {
                    let left = a.get(&key.attribute).unwrap_or(&Value::Null);
                    let right = b.get(&key.attribute).unwrap_or(&Value::Null);
                    let ord = match key.direction {
                        SortDirection::Asc => left.sort_cmp(right),
                        SortDirection::Desc => right.sort_cmp(left),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let skip = criteria.skip.unwrap_or(0);
        let limit = criteria.limit.unwrap_or(usize::MAX);
        Ok(records.into_iter().skip(skip).take(limit).collect())
    }
}

fn test(value: &Value, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Eq(operand) => equals(value, operand),
        Predicate::In(operands) => operands.iter().any(|o| equals(value, o)),
        Predicate::IsNull => value.is_null(),
        Predicate::Not(inner) => !test(value, inner),
        Predicate::Compare(op, operand) => {
            let Some(ord) = compare(value, operand) else {
                return false;
            };
            match op {
                CmpOp::Lt => ord == Ordering::Less,
                CmpOp::Lte => ord != Ordering::Greater,
                CmpOp::Gt => ord == Ordering::Greater,
                CmpOp::Gte => ord != Ordering::Less,
            }
        }
        Predicate::StartsWith(prefix) => {
            text_of(value).is_some_and(|t| t.starts_with(&prefix.to_lowercase()))
        }
        Predicate::EndsWith(suffix) => {
            text_of(value).is_some_and(|t| t.ends_with(&suffix.to_lowercase()))
        }
        Predicate::Contains(needle) => {
            text_of(value).is_some_and(|t| t.contains(&needle.to_lowercase()))
        }
        Predicate::Like(pattern) => text_of(value).is_some_and(|t| like(&t, &pattern.to_lowercase())),
    }
}

/// Lowercased text of a text or numeric value.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s.to_lowercase()),
        Value::Integer(_) | Value::Float(_) => Some(value.to_string()),
        _ => None,
    }
}

/// Brings a text or epoch operand to a date when compared with a date.
fn coerce<'a>(value: &Value, operand: &'a Value) -> std::borrow::Cow<'a, Value> {
    use std::borrow::Cow;
    match (value, operand) {
        (Value::DateTime(_), Value::Text(_) | Value::Integer(_)) => parse_datetime(operand)
            .map(|dt| Cow::Owned(Value::DateTime(dt)))
            .unwrap_or(Cow::Borrowed(operand)),
        _ => Cow::Borrowed(operand),
    }
}

fn equals(value: &Value, operand: &Value) -> bool {
    let operand = coerce(value, operand);
    match (value, operand.as_ref()) {
        (Value::Text(a), Value::Text(b)) => a.to_lowercase() == b.to_lowercase(),
        (a, b) if a.is_number() && b.is_number() => a.compare(b) == Some(Ordering::Equal),
        (a, b) => a == b,
    }
}

fn compare(value: &Value, operand: &Value) -> Option<Ordering> {
    if value.is_null() {
        return None;
    }
    value.compare(&coerce(value, operand))
}

/// Matches `text` against a pattern where `%` stands for any run of
/// characters. Both sides are expected lowercased.
fn like(text: &str, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split('%').collect();
    if parts.len() == 1 {
        return text == pattern;
    }
    let (first, last) = (parts[0], parts[parts.len() - 1]);
    if !text.starts_with(first) || text.len() < first.len() + last.len() {
        return false;
    }
    let mut rest = &text[first.len()..];
    for middle in &parts[1..parts.len() - 1] {
        match rest.find(middle) {
            Some(pos) => rest = &rest[pos + middle.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}
