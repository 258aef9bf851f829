//! JSON criteria parser.

use super::{AggregateOptions, CmpOp, Criteria, Filter, Predicate, SortDirection, SortKey};
use crate::error::{CoreError, CoreResult};
use kvdoc_codec::Value;
use serde_json::{Map, Value as Json};

const RESERVED: &[&str] = &[
    "where", "sort", "skip", "limit", "groupBy", "sum", "average", "min", "max", "select",
    "joins",
];

impl Criteria {
    /// Parses criteria from JSON.
    ///
    /// An object without any reserved key (`where`, `sort`, `skip`, `limit`,
    /// `groupBy`, `sum`, `average`, `min`, `max`, `select`, `joins`) is taken
    /// as the where clause itself. A top-level array is an `or` list.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuerySyntax` for anything the grammar does not accept.
    pub fn from_json(json: &Json) -> CoreResult<Self> {
        match json {
            Json::Null => Ok(Self::new()),
            Json::Array(items) => Ok(Self::new().filter(parse_or(items)?)),
            Json::Object(map) if !map.keys().any(|k| RESERVED.contains(&k.as_str())) => {
                Ok(Self::new().filter(parse_where(map)?))
            }
            Json::Object(map) => parse_full(map),
            other => Err(CoreError::invalid_query(format!(
                "criteria must be an object, found {other}"
            ))),
        }
    }
}

fn parse_full(map: &Map<String, Json>) -> CoreResult<Criteria> {
    let mut criteria = Criteria::new();

    match map.get("where") {
        None | Some(Json::Null) => {}
        Some(Json::Object(clause)) => criteria.filter = parse_where(clause)?,
        Some(Json::Array(items)) => criteria.filter = parse_or(items)?,
        Some(other) => {
            return Err(CoreError::invalid_query(format!(
                "where must be an object, found {other}"
            )))
        }
    }
    if let Some(sort) = map.get("sort") {
        criteria.sort = parse_sort(sort)?;
    }
    criteria.skip = parse_count(map, "skip")?;
    criteria.limit = parse_count(map, "limit")?;
    criteria.aggregate = AggregateOptions {
        group_by: parse_names(map, "groupBy")?,
        sum: parse_names(map, "sum")?,
        average: parse_names(map, "average")?,
        min: parse_names(map, "min")?,
        max: parse_names(map, "max")?,
    };
    criteria.select = parse_names(map, "select")?;
    criteria.joins = map.get("joins").filter(|j| !j.is_null()).cloned();
    Ok(criteria)
}

fn parse_or(items: &[Json]) -> CoreResult<Filter> {
    items
        .iter()
        .map(|item| match item {
            Json::Object(clause) => parse_where(clause),
            other => Err(CoreError::invalid_query(format!(
                "or clauses must be objects, found {other}"
            ))),
        })
        .collect::<CoreResult<Vec<_>>>()
        .map(Filter::Or)
}

fn parse_and(items: &[Json]) -> CoreResult<Filter> {
    match parse_or(items)? {
        Filter::Or(children) => Ok(Filter::And(children)),
        other => Ok(other),
    }
}

fn parse_where(clause: &Map<String, Json>) -> CoreResult<Filter> {
    let mut filters = Vec::with_capacity(clause.len());
    for (key, value) in clause {
        match key.as_str() {
            "or" => match value {
                Json::Array(items) => filters.push(parse_or(items)?),
                _ => return Err(CoreError::invalid_query("or expects an array")),
            },
            "and" => match value {
                Json::Array(items) => filters.push(parse_and(items)?),
                _ => return Err(CoreError::invalid_query("and expects an array")),
            },
            "like" => match value {
                Json::Object(patterns) => {
                    for (attribute, pattern) in patterns {
                        filters.push(Filter::attr(
                            attribute.clone(),
                            Predicate::Like(pattern_operand("like", pattern)?),
                        ));
                    }
                }
                _ => return Err(CoreError::invalid_query("like expects an object")),
            },
            attribute => filters.push(parse_attribute(attribute, value)?),
        }
    }
    Ok(match filters.len() {
        0 => Filter::All,
        1 => filters.remove(0),
        _ => Filter::And(filters),
    })
}

fn parse_attribute(attribute: &str, value: &Json) -> CoreResult<Filter> {
    let predicate = match value {
        Json::Object(ops) => {
            if ops.is_empty() {
                return Err(CoreError::invalid_query(format!(
                    "empty condition for attribute {attribute}"
                )));
            }
            let mut preds = ops
                .iter()
                .map(|(op, operand)| parse_operator(op, operand))
                .collect::<CoreResult<Vec<_>>>()?;
            if preds.len() == 1 {
                preds.remove(0)
            } else {
                return Ok(Filter::And(
                    preds
                        .into_iter()
                        .map(|p| Filter::attr(attribute, p))
                        .collect(),
                ));
            }
        }
        other => value_predicate(other),
    };
    Ok(Filter::attr(attribute, predicate))
}

fn value_predicate(value: &Json) -> Predicate {
    match value {
        Json::Null => Predicate::IsNull,
        Json::Array(items) => Predicate::In(items.iter().cloned().map(Value::from).collect()),
        other => Predicate::Eq(Value::from(other.clone())),
    }
}

fn parse_operator(op: &str, operand: &Json) -> CoreResult<Predicate> {
    let compare = |cmp: CmpOp| -> CoreResult<Predicate> {
        match operand {
            Json::Null | Json::Array(_) | Json::Object(_) => Err(CoreError::invalid_query(
                format!("{op} expects a scalar operand, found {operand}"),
            )),
            other => Ok(Predicate::Compare(cmp, Value::from(other.clone()))),
        }
    };
    match op {
        "<" | "lessThan" => compare(CmpOp::Lt),
        "<=" | "lessThanOrEqual" => compare(CmpOp::Lte),
        ">" | "greaterThan" => compare(CmpOp::Gt),
        ">=" | "greaterThanOrEqual" => compare(CmpOp::Gte),
        "!" | "not" => match operand {
            Json::Object(_) => Err(CoreError::invalid_query(format!(
                "{op} expects a value or a list of values"
            ))),
            other => Ok(Predicate::Not(Box::new(value_predicate(other)))),
        },
        "startsWith" => Ok(Predicate::StartsWith(pattern_operand(op, operand)?)),
        "endsWith" => Ok(Predicate::EndsWith(pattern_operand(op, operand)?)),
        "contains" => Ok(Predicate::Contains(pattern_operand(op, operand)?)),
        "like" => Ok(Predicate::Like(pattern_operand(op, operand)?)),
        unknown => Err(CoreError::invalid_query(format!(
            "unknown operator {unknown}"
        ))),
    }
}

fn pattern_operand(op: &str, operand: &Json) -> CoreResult<String> {
    operand
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CoreError::invalid_query(format!("{op} expects a string, found {operand}")))
}

fn parse_sort(sort: &Json) -> CoreResult<Vec<SortKey>> {
    match sort {
        Json::Null => Ok(Vec::new()),
        Json::String(text) => text
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(parse_sort_string)
            .collect(),
        Json::Object(keys) => keys
            .iter()
            .map(|(attribute, direction)| {
                Ok(SortKey {
                    attribute: attribute.clone(),
                    direction: parse_direction(direction)?,
                })
            })
            .collect(),
        Json::Array(items) => {
            let mut keys = Vec::new();
            for item in items {
                keys.extend(parse_sort(item)?);
            }
            Ok(keys)
        }
        other => Err(CoreError::invalid_query(format!("invalid sort {other}"))),
    }
}

fn parse_sort_string(part: &str) -> CoreResult<SortKey> {
    let mut words = part.split_whitespace();
    let attribute = words
        .next()
        .ok_or_else(|| CoreError::invalid_query("empty sort key"))?;
    let direction = match words.next() {
        None => SortDirection::Asc,
        Some(word) => parse_direction(&Json::String(word.to_string()))?,
    };
    if words.next().is_some() {
        return Err(CoreError::invalid_query(format!("invalid sort {part}")));
    }
    Ok(SortKey {
        attribute: attribute.to_string(),
        direction,
    })
}

fn parse_direction(direction: &Json) -> CoreResult<SortDirection> {
    match direction {
        Json::Number(n) if n.as_i64() == Some(1) => Ok(SortDirection::Asc),
        Json::Number(n) if n.as_i64() == Some(-1) => Ok(SortDirection::Desc),
        Json::String(s) if s.eq_ignore_ascii_case("asc") => Ok(SortDirection::Asc),
        Json::String(s) if s.eq_ignore_ascii_case("desc") => Ok(SortDirection::Desc),
        other => Err(CoreError::invalid_query(format!(
            "invalid sort direction {other}"
        ))),
    }
}

fn parse_count(map: &Map<String, Json>, key: &str) -> CoreResult<Option<usize>> {
    match map.get(key) {
        None | Some(Json::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| {
                CoreError::invalid_query(format!(
                    "{key} must be a non-negative integer, found {value}"
                ))
            }),
    }
}

fn parse_names(map: &Map<String, Json>, key: &str) -> CoreResult<Vec<String>> {
    match map.get(key) {
        None | Some(Json::Null) => Ok(Vec::new()),
        Some(Json::String(name)) => Ok(vec![name.clone()]),
        Some(Json::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    CoreError::invalid_query(format!("{key} expects attribute names"))
                })
            })
            .collect(),
        Some(other) => Err(CoreError::invalid_query(format!(
            "{key} expects an attribute name or a list of names, found {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(json: Json) -> Criteria {
        Criteria::from_json(&json).unwrap()
    }

    fn parse_err(json: Json) -> CoreError {
        Criteria::from_json(&json).unwrap_err()
    }

    #[test]
    fn bare_object_is_where_clause() {
        let criteria = parse(json!({"name": "Steve"}));
        assert_eq!(criteria.filter, Filter::eq("name", "Steve"));
        assert_eq!(criteria.limit, None);
    }

    #[test]
    fn full_form() {
        let criteria = parse(json!({
            "where": {"age": {">": 18, "<=": 30}},
            "sort": {"name": "desc"},
            "skip": 2,
            "limit": 5,
            "sum": "age",
            "groupBy": ["type"],
            "select": ["name"]
        }));

        assert_eq!(
            criteria.filter,
            Filter::And(vec![
                Filter::attr("age", Predicate::Compare(CmpOp::Lte, 30.into())),
                Filter::attr("age", Predicate::Compare(CmpOp::Gt, 18.into())),
            ])
        );
        assert_eq!(criteria.sort[0].direction, SortDirection::Desc);
        assert_eq!((criteria.skip, criteria.limit), (Some(2), Some(5)));
        assert_eq!(criteria.aggregate.sum, vec!["age".to_string()]);
        assert_eq!(criteria.aggregate.group_by, vec!["type".to_string()]);
        assert_eq!(criteria.select, vec!["name".to_string()]);
    }

    #[test]
    fn top_level_array_is_or() {
        let criteria = parse(json!([{"name": "a"}, {"name": "b"}]));
        assert_eq!(
            criteria.filter,
            Filter::Or(vec![Filter::eq("name", "a"), Filter::eq("name", "b")])
        );
    }

    #[test]
    fn in_null_and_not() {
        let criteria = parse(json!({"age": [1, 2], "email": null, "type": {"not": "x"}}));
        assert_eq!(
            criteria.filter,
            Filter::And(vec![
                Filter::attr("age", Predicate::In(vec![1.into(), 2.into()])),
                Filter::attr("email", Predicate::IsNull),
                Filter::attr("type", Predicate::Not(Box::new(Predicate::Eq("x".into())))),
            ])
        );
    }

    #[test]
    fn like_forms() {
        let attr = parse(json!({"name": {"like": "st%"}}));
        assert_eq!(attr.filter, Filter::attr("name", Predicate::Like("st%".into())));

        let top = parse(json!({"like": {"name": "%ve"}}));
        assert_eq!(top.filter, Filter::attr("name", Predicate::Like("%ve".into())));
    }

    #[test]
    fn sort_string_forms() {
        let criteria = parse(json!({"sort": "age desc, name"}));
        assert_eq!(criteria.sort.len(), 2);
        assert_eq!(criteria.sort[0].attribute, "age");
        assert_eq!(criteria.sort[0].direction, SortDirection::Desc);
        assert_eq!(criteria.sort[1].direction, SortDirection::Asc);

        let numeric = parse(json!({"sort": {"age": -1}}));
        assert_eq!(numeric.sort[0].direction, SortDirection::Desc);
    }

    #[test]
    fn rejects_bad_syntax() {
        for bad in [
            json!({"age": {"between": 3}}),
            json!({"name": {"like": 3}}),
            json!({"or": {"name": "a"}}),
            json!({"or": ["a"]}),
            json!({"where": {}, "limit": -1}),
            json!({"where": {}, "sort": {"age": "up"}}),
            json!({"age": {}}),
            json!("name"),
        ] {
            assert!(
                matches!(parse_err(bad.clone()), CoreError::InvalidQuerySyntax { .. }),
                "accepted {bad}"
            );
        }
    }

    #[test]
    fn null_and_empty_match_everything() {
        assert!(parse(Json::Null).filter.is_all());
        assert!(parse(json!({})).filter.is_all());
        assert!(parse(json!({"where": null, "limit": 1})).filter.is_all());
    }
}
