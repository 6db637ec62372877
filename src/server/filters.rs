use crate::{common::query::QueryParams, server::EngineError};
use serde_json::{Map, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Operator {
    Gte,
    Gt,
    Lte,
    Lt,
    Neq,
}

const OPERATOR_SUFFIXES: [(&str, Operator); 5] = [
    ("_gte", Operator::Gte),
    ("_gt", Operator::Gt),
    ("_lte", Operator::Lte),
    ("_lt", Operator::Lt),
    ("_neq", Operator::Neq),
];

/// The `filter`, `sort` and `range` parameters of a collection read.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct CollectionQuery {
    pub filter: Map<String, Value>,
    pub sort: Option<(String, SortOrder)>,
    pub range: Option<(usize, usize)>,
}

/// A page of a collection read.
#[derive(Debug, PartialEq)]
pub(crate) struct Page {
    pub items: Vec<Value>,
    /// Number of items matching the filter, before the range is applied.
    pub total: usize,
    pub first: usize,
}

impl CollectionQuery {
    /// Builds the query from request parameters layered over the collection's default query.
    pub fn from_params(
        params: &QueryParams,
        default_query: Option<&Value>,
    ) -> Result<Self, EngineError> {
        let mut query = CollectionQuery::default();

        if let Some(default_query) = default_query {
            let default_query = default_query.as_object().ok_or_else(|| {
                EngineError::InvalidQuery("default query must be a JSON object".to_string())
            })?;
            query.apply(default_query)?;
        }

        query.apply(params)?;
        Ok(query)
    }

    fn apply(&mut self, params: &Map<String, Value>) -> Result<(), EngineError> {
        if let Some(filter) = params.get("filter") {
            let filter = filter.as_object().ok_or_else(|| {
                EngineError::InvalidQuery(format!("filter must be a JSON object: {}", filter))
            })?;
            for (key, value) in filter {
                self.filter.insert(key.clone(), value.clone());
            }
        }

        if let Some(sort) = params.get("sort") {
            self.sort = Some(parse_sort(sort)?);
        }

        if let Some(range) = params.get("range") {
            self.range = Some(parse_range(range)?);
        }

        Ok(())
    }

    pub fn execute(&self, items: Vec<Value>) -> Page {
        let mut items: Vec<Value> = items
            .into_iter()
            .filter(|item| match item.as_object() {
                Some(item) => self
                    .filter
                    .iter()
                    .all(|(key, expected)| matches_filter(item, key, expected)),
                None => false,
            })
            .collect();

        let total = items.len();

        if let Some((field, order)) = &self.sort {
            items.sort_by(|a, b| {
                let ordering = compare_optional(a.get(field), b.get(field));
                match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        let (first, items) = match self.range {
            None => (0, items),
            Some((start, end)) => {
                let items = items
                    .into_iter()
                    .skip(start)
                    .take(end.saturating_sub(start).saturating_add(1))
                    .collect();
                (start, items)
            }
        };

        Page {
            items,
            total,
            first,
        }
    }
}

fn parse_sort(sort: &Value) -> Result<(String, SortOrder), EngineError> {
    let invalid = || {
        EngineError::InvalidQuery(format!(
            "sort must be a field name or [field, \"ASC\"|\"DESC\"]: {}",
            sort
        ))
    };

    match sort {
        Value::String(field) => Ok((field.clone(), SortOrder::Asc)),
        Value::Array(parts) => {
            let field = parts.first().and_then(Value::as_str).ok_or_else(invalid)?;
            let order = match parts.get(1).and_then(Value::as_str) {
                None => SortOrder::Asc,
                Some(order) if order.eq_ignore_ascii_case("asc") => SortOrder::Asc,
                Some(order) if order.eq_ignore_ascii_case("desc") => SortOrder::Desc,
                Some(_) => return Err(invalid()),
            };
            Ok((field.to_string(), order))
        }
        _ => Err(invalid()),
    }
}

fn parse_range(range: &Value) -> Result<(usize, usize), EngineError> {
    let bound = |value: &Value| value.as_u64().and_then(|n| usize::try_from(n).ok());
    let bounds = range
        .as_array()
        .filter(|bounds| bounds.len() == 2)
        .and_then(|bounds| Some((bound(&bounds[0])?, bound(&bounds[1])?)));

    match bounds {
        Some((start, end)) if start <= end => Ok((start, end)),
        _ => Err(EngineError::InvalidQuery(format!(
            "range must be [start, end] with start <= end: {}",
            range
        ))),
    }
}

fn matches_filter(item: &Map<String, Value>, key: &str, expected: &Value) -> bool {
    if key == "q" {
        return matches_full_text(item, expected);
    }

    for (suffix, operator) in OPERATOR_SUFFIXES.iter() {
        if let Some(field) = key.strip_suffix(suffix) {
            return matches_operator(item.get(field), *operator, expected);
        }
    }

    let actual = match item.get(key) {
        None => return expected.is_null(),
        Some(actual) => actual,
    };

    match (actual, expected) {
        (_, Value::Array(candidates)) => candidates.iter().any(|c| loose_eq(actual, c)),
        (Value::Array(values), _) => values.iter().any(|v| loose_eq(v, expected)),
        _ => loose_eq(actual, expected),
    }
}

fn matches_operator(actual: Option<&Value>, operator: Operator, expected: &Value) -> bool {
    let actual = match actual {
        None => return operator == Operator::Neq,
        Some(actual) => actual,
    };

    let ordering = || compare_values(actual, expected);

    match operator {
        Operator::Neq => !loose_eq(actual, expected),
        Operator::Gte => ordering().map_or(false, |o| o != Ordering::Less),
        Operator::Gt => ordering() == Some(Ordering::Greater),
        Operator::Lte => ordering().map_or(false, |o| o != Ordering::Greater),
        Operator::Lt => ordering() == Some(Ordering::Less),
    }
}

fn matches_full_text(item: &Map<String, Value>, expected: &Value) -> bool {
    let needle = match scalar_to_string(expected) {
        None => return false,
        Some(needle) => needle.to_lowercase(),
    };

    item.values()
        .filter_map(scalar_to_string)
        .any(|value| value.to_lowercase().contains(&needle))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Equality where numbers and their string forms are considered equal, as query string
/// values always arrive as strings.
fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }

    match (a, b) {
        (Value::Array(_), _) | (Value::Object(_), _) => false,
        (_, Value::Array(_)) | (_, Value::Object(_)) => false,
        _ => match (scalar_to_string(a), scalar_to_string(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Value::String(a), Value::String(b)) = (a, b) {
        return Some(a.cmp(b));
    }

    match (as_number(a), as_number(b)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => None,
    }
}

fn compare_optional(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_values(a, b).unwrap_or(Ordering::Equal),
    }
}
