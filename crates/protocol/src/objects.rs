//! Structural copy helpers over JSON objects
//!
//! Rows are assembled by copying fields from several parts of an event into
//! one target object, optionally renaming keys on the way. The helpers here
//! mirror each other: [`transfer`] copies every field of a source object,
//! [`transfer_value`] copies a single value under a fixed key.

use serde_json::{Map, Value};

use crate::strings;

/// Key naming applied while copying objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyCase {
    /// Keys are copied verbatim
    Original,
    /// Keys are converted with [`strings::to_snake_case`]
    #[default]
    SnakeCase,
    /// Keys are converted with [`strings::to_classic`]
    Classic,
}

impl KeyCase {
    /// Pick raw or snake_case transfer from the `keep_original_names` option
    #[inline]
    pub fn from_keep_original(keep_original_names: bool) -> Self {
        if keep_original_names {
            Self::Original
        } else {
            Self::SnakeCase
        }
    }

    /// Convert a single key
    pub fn key(self, key: &str) -> String {
        match self {
            Self::Original => key.to_string(),
            Self::SnakeCase => strings::to_snake_case(key).into_owned(),
            Self::Classic => strings::to_classic(key).into_owned(),
        }
    }

    /// Convert every object key reachable from `value`, recursing through
    /// arrays. Scalars are returned as-is.
    pub fn value(self, value: &Value) -> Value {
        if self == Self::Original {
            return value.clone();
        }
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (self.key(k), self.value(v)))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.value(v)).collect()),
            other => other.clone(),
        }
    }
}

/// Copy all fields of `source` into `target`, skipping keys listed in `omit`.
///
/// `omit` is matched against the source keys before conversion. A source that
/// is absent or not an object copies nothing.
pub fn transfer(target: &mut Map<String, Value>, source: Option<&Value>, omit: &[&str], case: KeyCase) {
    if let Some(Value::Object(source)) = source {
        transfer_map(target, source, omit, case);
    }
}

/// [`transfer`] from a map, e.g. the top level of an event
pub fn transfer_map(
    target: &mut Map<String, Value>,
    source: &Map<String, Value>,
    omit: &[&str],
    case: KeyCase,
) {
    for (k, v) in source {
        if omit.contains(&k.as_str()) {
            continue;
        }
        target.insert(case.key(k), case.value(v));
    }
}

/// Copy `value` under `key` when present. The key itself is not converted.
pub fn transfer_value(target: &mut Map<String, Value>, key: &str, value: Option<&Value>, case: KeyCase) {
    if let Some(value) = value {
        target.insert(key.to_string(), case.value(value));
    }
}

/// Insert `value` under `key` only when it is present
#[inline]
pub fn put(target: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        target.insert(key.to_string(), value);
    }
}

/// Truthiness of a JSON value: `null`, `false`, `0`, `NaN` and `""` are falsy
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// First present, non-null value
pub fn coalesce<'a>(values: impl IntoIterator<Item = Option<&'a Value>>) -> Option<&'a Value> {
    values.into_iter().flatten().find(|v| !v.is_null())
}

/// First truthy value
pub fn first_truthy<'a>(values: impl IntoIterator<Item = Option<&'a Value>>) -> Option<&'a Value> {
    values.into_iter().flatten().find(|v| truthy(v))
}

/// Follow a path of object keys
pub fn get_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.as_object()?.get(*key))
}

/// Whether `value` is an object with at least one field
#[inline]
pub fn is_non_empty_object(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Object(map)) if !map.is_empty())
}

/// Wrap a map as a value unless it is empty
#[inline]
pub fn non_empty(map: Map<String, Value>) -> Option<Value> {
    (!map.is_empty()).then_some(Value::Object(map))
}
