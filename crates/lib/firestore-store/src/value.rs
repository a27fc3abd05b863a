//! Firestore REST typed values and their mapping to plain JSON.
//!
//! Firestore's JSON wire format wraps every value in a single-key object
//! naming its type (`{"stringValue": "x"}`, `{"integerValue": "42"}`).
//! Tools speak plain JSON, so documents are encoded on the way in and decoded
//! on the way out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Fields of a Firestore document on the wire.
pub type FieldMap = BTreeMap<String, FirestoreValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FirestoreValue {
    NullValue(Option<String>),
    BooleanValue(bool),
    /// int64 values travel as decimal strings.
    IntegerValue(String),
    DoubleValue(DoubleRepr),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(GeoPoint),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

/// Doubles are numbers, except `NaN` and the infinities which arrive as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DoubleRepr {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<FirestoreValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: FieldMap,
}

/// Encodes a JSON value as a Firestore typed value.
#[must_use]
pub fn encode_value(value: &Value) -> FirestoreValue {
    match value {
        Value::Null => FirestoreValue::NullValue(None),
        Value::Bool(flag) => FirestoreValue::BooleanValue(*flag),
        Value::Number(number) => encode_number(number),
        Value::String(text) => FirestoreValue::StringValue(text.clone()),
        Value::Array(items) => FirestoreValue::ArrayValue(ArrayValue {
            values: items.iter().map(encode_value).collect(),
        }),
        Value::Object(map) => FirestoreValue::MapValue(MapValue {
            fields: encode_fields(map),
        }),
    }
}

/// Encodes a JSON object as Firestore document fields.
#[must_use]
pub fn encode_fields(fields: &Map<String, Value>) -> FieldMap {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect()
}

/// Decodes a Firestore typed value into plain JSON.
#[must_use]
pub fn decode_value(value: FirestoreValue) -> Value {
    match value {
        FirestoreValue::NullValue(_) => Value::Null,
        FirestoreValue::BooleanValue(flag) => Value::Bool(flag),
        FirestoreValue::IntegerValue(text) => text
            .parse::<i64>()
            .map_or(Value::String(text), |parsed| Value::Number(parsed.into())),
        FirestoreValue::DoubleValue(DoubleRepr::Number(number)) => Number::from_f64(number)
            .map_or_else(|| Value::String(number.to_string()), Value::Number),
        FirestoreValue::DoubleValue(DoubleRepr::Text(text))
        | FirestoreValue::TimestampValue(text)
        | FirestoreValue::StringValue(text)
        | FirestoreValue::BytesValue(text)
        | FirestoreValue::ReferenceValue(text) => Value::String(text),
        FirestoreValue::GeoPointValue(point) => {
            let mut map = Map::new();
            map.insert("latitude".to_string(), float_or_null(point.latitude));
            map.insert("longitude".to_string(), float_or_null(point.longitude));
            Value::Object(map)
        }
        FirestoreValue::ArrayValue(array) => {
            Value::Array(array.values.into_iter().map(decode_value).collect())
        }
        FirestoreValue::MapValue(map) => Value::Object(decode_fields(map.fields)),
    }
}

/// Decodes Firestore document fields into a JSON object.
#[must_use]
pub fn decode_fields(fields: FieldMap) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(name, value)| (name, decode_value(value)))
        .collect()
}

fn encode_number(number: &Number) -> FirestoreValue {
    if let Some(integer) = number.as_i64() {
        return FirestoreValue::IntegerValue(integer.to_string());
    }
    number.as_f64().map_or_else(
        || FirestoreValue::StringValue(number.to_string()),
        |double| FirestoreValue::DoubleValue(DoubleRepr::Number(double)),
    )
}

fn float_or_null(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encodes_integers_as_strings_and_floats_as_doubles() {
        let encoded = serde_json::to_value(encode_value(&json!({"n": 42, "x": 1.5}))).unwrap();

        assert_eq!(
            encoded,
            json!({"mapValue": {"fields": {
                "n": {"integerValue": "42"},
                "x": {"doubleValue": 1.5}
            }}})
        );
    }

    #[test]
    fn nested_document_survives_encode_and_decode() {
        let original = json!({
            "name": "Ada",
            "active": true,
            "score": 9.25,
            "visits": 3,
            "tags": ["a", "b"],
            "address": {"city": "London", "zip": null},
            "empty": []
        });
        let fields = encode_fields(original.as_object().unwrap());

        assert_eq!(Value::Object(decode_fields(fields)), original);
    }

    #[test]
    fn decodes_wire_only_types() {
        let wire = json!({
            "created": {"timestampValue": "2024-01-02T03:04:05.123456Z"},
            "owner": {"referenceValue": "projects/p/databases/(default)/documents/users/u1"},
            "where": {"geoPointValue": {"latitude": 51.5}},
            "ratio": {"doubleValue": "NaN"},
            "nothing": {"nullValue": null}
        });
        let fields: FieldMap = serde_json::from_value(wire).unwrap();

        assert_eq!(
            Value::Object(decode_fields(fields)),
            json!({
                "created": "2024-01-02T03:04:05.123456Z",
                "owner": "projects/p/databases/(default)/documents/users/u1",
                "where": {"latitude": 51.5, "longitude": 0.0},
                "ratio": "NaN",
                "nothing": null
            })
        );
    }

    #[test]
    fn out_of_range_integer_text_is_kept_verbatim() {
        let decoded = decode_value(FirestoreValue::IntegerValue("not-a-number".to_string()));

        assert_eq!(decoded, json!("not-a-number"));
    }
}
