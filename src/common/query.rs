use serde_json::{Map, Value};

/// Query parameters of a request, keyed by parameter name.
///
/// Plain values are JSON strings, values that look like JSON arrays or objects are
/// parsed (so `filter={"title":"Alice"}` can be read as an object), bare keys map to
/// `true` and repeated keys collect their values into an array.
pub type QueryParams = Map<String, Value>;

/// Parses an already decoded query string (the part after `?`) into [`QueryParams`].
pub fn parse_query_string(query: &str) -> QueryParams {
    let mut collected: Vec<(String, Vec<Value>)> = Vec::new();

    for element in query.split('&').filter(|e| !e.is_empty()) {
        let (key, value) = match element.split_once('=') {
            None => (element.trim(), Value::Bool(true)),
            Some((key, value)) => (key.trim(), parse_value(value)),
        };

        if key.is_empty() {
            continue;
        }

        match collected.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => values.push(value),
            None => collected.push((key.to_string(), vec![value])),
        }
    }

    collected
        .into_iter()
        .map(|(key, mut values)| {
            let value = if values.len() == 1 {
                values.remove(0)
            } else {
                Value::Array(values)
            };
            (key, value)
        })
        .collect()
}

fn parse_value(value: &str) -> Value {
    if value.starts_with('[') || value.starts_with('{') {
        if let Ok(parsed) = serde_json::from_str(value) {
            return parsed;
        }
        tracing::debug!("Query value '{}' looks like JSON but cannot be parsed", value);
    }

    Value::String(value.to_string())
}
