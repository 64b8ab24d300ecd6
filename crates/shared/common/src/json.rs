//! JSON conversion helpers.
//!
//! Conversions ignore unknown properties and, when a strict conversion
//! fails, retry with empty strings and empty arrays read as null. Dates use
//! the chrono serde representation (RFC 3339), never epoch numbers.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use domain::DataError;

use crate::error::{AppError, AppResult};

/// Generic JSON object.
pub type JsonMap = Map<String, Value>;

pub fn to_value<T: Serialize + ?Sized>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| AppError::internal(format!("Serialization error: {}", e)))
}

/// Serialize into an object. `null` becomes an empty object.
pub fn to_map<T: Serialize + ?Sized>(value: &T) -> AppResult<JsonMap> {
    match to_value(value)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(JsonMap::new()),
        other => Err(AppError::bad_request(format!(
            "Expected an object, got {}",
            other
        ))),
    }
}

pub fn to_string<T: Serialize + ?Sized>(value: &T) -> AppResult<String> {
    serde_json::to_string(value)
        .map_err(|e| AppError::internal(format!("Serialization error: {}", e)))
}

pub fn from_value<T: DeserializeOwned>(value: Value) -> AppResult<T> {
    if !contains_empty(&value) {
        return serde_json::from_value(value).map_err(|e| AppError::bad_request(e.to_string()));
    }

    serde_json::from_value(value.clone()).or_else(|strict| {
        serde_json::from_value(empty_as_null(value))
            .map_err(|_| AppError::bad_request(strict.to_string()))
    })
}

pub fn from_map<T: DeserializeOwned>(map: JsonMap) -> AppResult<T> {
    from_value(Value::Object(map))
}

pub fn from_str<T: DeserializeOwned>(json: &str) -> AppResult<T> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| AppError::bad_request(e.to_string()))?;
    from_value(value)
}

/// Convert between two serializable shapes.
pub fn convert<S: Serialize + ?Sized, T: DeserializeOwned>(source: &S) -> AppResult<T> {
    from_value(to_value(source)?)
}

pub fn convert_all<'a, S, T, I>(sources: I) -> AppResult<Vec<T>>
where
    S: Serialize + 'a,
    T: DeserializeOwned,
    I: IntoIterator<Item = &'a S>,
{
    sources.into_iter().map(convert).collect()
}

/// Copy through a serialization round trip.
pub fn deep_clone<T: Serialize + DeserializeOwned>(value: &T) -> Result<T, DataError> {
    serde_json::to_value(value)
        .and_then(serde_json::from_value)
        .map_err(|_| DataError::CloneNotSupported)
}

fn contains_empty(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty() || items.iter().any(contains_empty),
        Value::Object(map) => map.values().any(contains_empty),
        _ => false,
    }
}

fn empty_as_null(value: Value) -> Value {
    match value {
        Value::String(s) if s.is_empty() => Value::Null,
        Value::Array(items) if items.is_empty() => Value::Null,
        Value::Array(items) => Value::Array(items.into_iter().map(empty_as_null).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, empty_as_null(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Merge `from` onto `to`.
///
/// When both sides hold an object under the same key the objects are merged
/// recursively; otherwise the value from `from` replaces the old one.
pub fn merge_map(from: JsonMap, mut to: JsonMap) -> JsonMap {
    for (key, incoming) in from {
        let merged = match (incoming, to.remove(&key)) {
            (Value::Object(nested), Some(Value::Object(existing))) => {
                Value::Object(merge_map(nested, existing))
            }
            (incoming, _) => incoming,
        };
        to.insert(key, merged);
    }
    to
}

/// Set `value` at a dotted `path`, creating intermediate objects.
///
/// Fails with [`DataError::InvalidDataType`] when an intermediate value
/// exists and is not an object.
pub fn put_value(target: &mut JsonMap, value: Value, path: &str) -> Result<(), DataError> {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return Err(DataError::InvalidDataType(path.to_string()));
    };

    let mut current = target;
    for key in parents {
        let entry = current.entry(key.to_string()).or_insert(Value::Null);
        if entry.is_null() {
            *entry = Value::Object(JsonMap::new());
        }
        current = match entry {
            Value::Object(map) => map,
            _ => return Err(DataError::InvalidDataType(path.to_string())),
        };
    }

    current.insert(last.to_string(), value);
    Ok(())
}

/// First row whose values equal every value of `keys`. A null key value
/// matches nothing.
pub fn find_duplicate<'a>(rows: &'a [JsonMap], keys: &JsonMap) -> Option<&'a JsonMap> {
    if keys.values().any(Value::is_null) {
        return None;
    }

    rows.iter()
        .find(|row| keys.iter().all(|(k, v)| row.get(k) == Some(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn object(value: Value) -> JsonMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_merge_nested_objects() {
        let merged = merge_map(object(json!({"a": {"b": 1}})), object(json!({"a": {"b": 0, "c": 2}})));
        assert_eq!(Value::Object(merged), json!({"a": {"b": 1, "c": 2}}));
    }

    #[test]
    fn test_merge_scalar_overwrites_object() {
        let merged = merge_map(object(json!({"a": 5})), object(json!({"a": {"b": 0}})));
        assert_eq!(Value::Object(merged), json!({"a": 5}));
    }

    #[test]
    fn test_merge_keeps_untouched_keys_and_adds_new() {
        let merged = merge_map(
            object(json!({"title": "Anatomy", "extra": [1]})),
            object(json!({"id": 3, "title": "Old"})),
        );
        assert_eq!(Value::Object(merged), json!({"id": 3, "title": "Anatomy", "extra": [1]}));
    }

    #[test]
    fn test_put_value_creates_path() {
        let mut target = JsonMap::new();
        put_value(&mut target, json!(7), "a.b.c").unwrap();
        put_value(&mut target, json!("x"), "a.d").unwrap();
        assert_eq!(Value::Object(target), json!({"a": {"b": {"c": 7}, "d": "x"}}));
    }

    #[test]
    fn test_put_value_rejects_scalar_parent() {
        let mut target = object(json!({"a": 1}));
        let err = put_value(&mut target, json!(2), "a.b").unwrap_err();
        assert_eq!(err, DataError::InvalidDataType("a.b".to_string()));
        assert_eq!(err.code(), 604);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Lesson {
        title: String,
        room: Option<Room>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Room {
        number: i32,
    }

    #[test]
    fn test_empty_string_read_as_null_object() {
        let lesson: Lesson = from_value(json!({"title": "Suturing", "room": "", "unknown": 1})).unwrap();
        assert_eq!(lesson.title, "Suturing");
        assert_eq!(lesson.room, None);
    }

    #[test]
    fn test_strict_failure_is_bad_request() {
        let result: AppResult<Lesson> = from_value(json!({"title": 5}));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_find_duplicate_requires_every_key() {
        let rows = vec![
            object(json!({"name": "Surgery", "code": "S"})),
            object(json!({"name": "Pediatrics", "code": "P"})),
        ];
        let found = find_duplicate(&rows, &object(json!({"code": "P", "name": "Pediatrics"})));
        assert_eq!(found.and_then(|r| r.get("name")), Some(&json!("Pediatrics")));
        assert!(find_duplicate(&rows, &object(json!({"code": "P", "name": "Surgery"}))).is_none());
        assert!(find_duplicate(&rows, &object(json!({"code": "P", "name": null}))).is_none());
    }
}
