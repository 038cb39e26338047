//! Conversion between plain JSON field maps and Firestore's typed values.

use super::models::{ArrayValue, MapValue, Value, ValueType};
use super::DocumentData;
use crate::core::error::{FirebaseError, FirebaseResult};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashMap;

pub fn fields_to_data(fields: HashMap<String, Value>) -> FirebaseResult<DocumentData> {
    let mut map = Map::new();
    for (key, value) in fields {
        map.insert(key, value_to_json(value)?);
    }
    Ok(map)
}

pub fn data_to_fields(data: &DocumentData) -> FirebaseResult<HashMap<String, Value>> {
    data.iter()
        .map(|(key, value)| Ok((key.clone(), json_to_value(value)?)))
        .collect()
}

pub fn value_to_json(value: Value) -> FirebaseResult<JsonValue> {
    Ok(match value.value_type {
        ValueType::StringValue(s) => JsonValue::String(s),
        ValueType::IntegerValue(s) => {
            let i: i64 = s.parse().map_err(|e| {
                FirebaseError::internal(format!("Failed to parse integer string '{}': {}", s, e))
            })?;
            JsonValue::Number(i.into())
        }
        ValueType::DoubleValue(d) => match serde_json::Number::from_f64(d) {
            Some(n) => JsonValue::Number(n),
            // NaN and infinities have no JSON form.
            None => JsonValue::Null,
        },
        ValueType::BooleanValue(b) => JsonValue::Bool(b),
        ValueType::MapValue(map_value) => JsonValue::Object(fields_to_data(map_value.fields)?),
        ValueType::ArrayValue(array_value) => {
            let values = array_value
                .values
                .into_iter()
                .map(value_to_json)
                .collect::<FirebaseResult<Vec<_>>>()?;
            JsonValue::Array(values)
        }
        ValueType::NullValue(_) => JsonValue::Null,
        ValueType::TimestampValue(s) => JsonValue::String(s),
        ValueType::GeoPointValue(gp) => {
            json!({ "latitude": gp.latitude, "longitude": gp.longitude })
        }
        ValueType::BytesValue(s) => JsonValue::String(s),
        ValueType::ReferenceValue(s) => JsonValue::String(s),
    })
}

pub fn json_to_value(value: &JsonValue) -> FirebaseResult<Value> {
    let value_type = match value {
        JsonValue::Null => ValueType::NullValue(()),
        JsonValue::Bool(b) => ValueType::BooleanValue(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                ValueType::IntegerValue(i.to_string())
            } else if let Some(f) = n.as_f64() {
                ValueType::DoubleValue(f)
            } else {
                return Err(FirebaseError::invalid_argument(format!(
                    "Unsupported number type: {}",
                    n
                )));
            }
        }
        JsonValue::String(s) => ValueType::StringValue(s.clone()),
        JsonValue::Array(a) => {
            let values = a.iter().map(json_to_value).collect::<FirebaseResult<Vec<_>>>()?;
            ValueType::ArrayValue(ArrayValue { values })
        }
        JsonValue::Object(o) => ValueType::MapValue(MapValue {
            fields: data_to_fields(o)?,
        }),
    };
    Ok(Value { value_type })
}

/// Quotes a top-level field name for use in an update mask.
pub fn quote_field_path(field: &str) -> String {
    let mut chars = field.chars();
    let simple = matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric());
    if simple {
        return field.to_string();
    }
    let escaped = field.replace('\\', "\\\\").replace('`', "\\`");
    format!("`{}`", escaped)
}
