//! Aggregate post-processing of query results.

use crate::criteria::AggregateOptions;
use crate::error::{CoreError, CoreResult};
use kvdoc_codec::{Record, Value};
use std::collections::HashMap;

/// Result of a find after aggregate processing.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregated {
    /// No aggregate directive: the matched records.
    Plain(Vec<Record>),
    /// One summary record per group.
    Grouped(Vec<Record>),
}

impl Aggregated {
    /// Returns the records, whichever kind they are.
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Aggregated::Plain(records) | Aggregated::Grouped(records) => records,
        }
    }

    /// Borrows the records.
    pub fn records(&self) -> &[Record] {
        match self {
            Aggregated::Plain(records) | Aggregated::Grouped(records) => records,
        }
    }

    /// Returns true for grouped results.
    pub fn is_grouped(&self) -> bool {
        matches!(self, Aggregated::Grouped(_))
    }
}

/// Computes `groupBy`, `sum`, `average`, `min` and `max` directives.
///
/// Only numeric values take part in a calculation. Without `groupBy` all
/// records form one implicit group. Groups are emitted in order of first
/// appearance, each carrying its group-by values from its first member.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateProcessor;

impl AggregateProcessor {
    /// Creates the processor.
    pub fn new() -> Self {
        Self
    }

    /// Applies the aggregate directives to `records`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAggregate` when grouping is requested without any
    /// calculation.
    pub fn process(&self, records: Vec<Record>, options: &AggregateOptions) -> CoreResult<Aggregated> {
        if options.is_empty() {
            return Ok(Aggregated::Plain(records));
        }
        if !options.has_calculation() {
            return Err(CoreError::invalid_aggregate(
                "cannot group without a calculation",
            ));
        }

        let mut order: Vec<Vec<String>> = Vec::new();
        let mut groups: HashMap<Vec<String>, Vec<&Record>> = HashMap::new();
        for record in &records {
            let key: Vec<String> = options
                .group_by
                .iter()
                .map(|attr| record.get(attr).unwrap_or(&Value::Null).to_string())
                .collect();
            if !groups.contains_key(&key) {
                order.push(key.clone());
            }
            groups.entry(key).or_default().push(record);
        }
        if order.is_empty() && options.group_by.is_empty() {
            order.push(Vec::new());
            groups.insert(Vec::new(), Vec::new());
        }

        let summaries = order
            .iter()
            .filter_map(|key| groups.get(key))
            .map(|members| summarize(members, options))
            .collect();
        Ok(Aggregated::Grouped(summaries))
    }
}

fn summarize(members: &[&Record], options: &AggregateOptions) -> Record {
    let mut stub = Record::new();
    if let Some(first) = members.first() {
        for attr in &options.group_by {
            stub.insert(
                attr.clone(),
                first.get(attr).cloned().unwrap_or(Value::Null),
            );
        }
    }
    for attr in &options.sum {
        stub.insert(attr.clone(), sum(numbers(members, attr)));
    }
    for attr in &options.average {
        stub.insert(attr.clone(), average(numbers(members, attr)));
    }
    for attr in &options.min {
        stub.insert(attr.clone(), extremum(numbers(members, attr), |a, b| a < b));
    }
    for attr in &options.max {
        stub.insert(attr.clone(), extremum(numbers(members, attr), |a, b| a > b));
    }
    stub
}

fn numbers<'a>(members: &'a [&'a Record], attr: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
    members
        .iter()
        .filter_map(move |r| r.get(attr))
        .filter(|v| v.is_number())
}

fn sum<'a>(values: impl Iterator<Item = &'a Value>) -> Value {
    let mut int_total: Option<i64> = Some(0);
    let mut float_total = 0.0_f64;
    for value in values {
        int_total = match (int_total, value) {
            (Some(total), Value::Integer(n)) => total.checked_add(*n),
            _ => None,
        };
        float_total += value.as_f64().unwrap_or(0.0);
    }
    int_total.map_or(Value::Float(float_total), Value::Integer)
}

fn average<'a>(values: impl Iterator<Item = &'a Value>) -> Value {
    let (total, count) = values.fold((0.0_f64, 0_u32), |(total, count), v| {
        (total + v.as_f64().unwrap_or(0.0), count + 1)
    });
    if count == 0 {
        Value::Null
    } else {
        Value::Float(total / f64::from(count))
    }
}

fn extremum<'a>(
    values: impl Iterator<Item = &'a Value>,
    better: impl Fn(f64, f64) -> bool,
) -> Value {
    let mut best: Option<&Value> = None;
    for value in values {
        let replace = match best {
            None => true,
            Some(current) => better(
                value.as_f64().unwrap_or(f64::NAN),
                current.as_f64().unwrap_or(f64::NAN),
            ),
        };
        if replace {
            best = Some(value);
        }
    }
    best.cloned().unwrap_or(Value::Null)
}
