use aws_sdk_dynamodb::types::AttributeValue;
use base64::{engine::general_purpose, Engine as _};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

use crate::error::ApiError;

/// Convert a whole DynamoDB item into a JSON object.
pub fn item_to_json(item: &HashMap<String, AttributeValue>) -> Value {
    let mut object = Map::new();
    for (name, attr) in item {
        object.insert(name.clone(), from_attribute_value(attr));
    }
    Value::Object(object)
}

/// Convert a JSON object into a DynamoDB item. Non-object values are a
/// caller error since every record is a map of named attributes.
pub fn json_to_item(value: &Value) -> Result<HashMap<String, AttributeValue>, ApiError> {
    let object = value
        .as_object()
        .ok_or_else(|| ApiError::BadRequest("Request body must be a JSON object".to_string()))?;

    let mut item = HashMap::new();
    for (name, field) in object {
        item.insert(name.clone(), to_attribute_value(field));
    }
    Ok(item)
}

pub fn to_attribute_value(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(values) => {
            AttributeValue::L(values.iter().map(to_attribute_value).collect())
        }
        Value::Object(object) => {
            let mut map = HashMap::new();
            for (name, field) in object {
                map.insert(name.clone(), to_attribute_value(field));
            }
            AttributeValue::M(map)
        }
    }
}

pub fn from_attribute_value(attr: &AttributeValue) -> Value {
    match attr {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => n
            .parse::<Number>()
            .map(Value::Number)
            // DynamoDB numbers exceed JSON number range; fall back to the raw string
            .unwrap_or_else(|_| Value::String(n.clone())),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(values) => {
            Value::Array(values.iter().map(from_attribute_value).collect())
        }
        AttributeValue::M(map) => item_to_json(map),
        AttributeValue::Ss(values) => {
            Value::Array(values.iter().map(|s| Value::String(s.clone())).collect())
        }
        AttributeValue::Ns(values) => Value::Array(
            values
                .iter()
                .map(|n| {
                    n.parse::<Number>()
                        .map(Value::Number)
                        .unwrap_or_else(|_| Value::String(n.clone()))
                })
                .collect(),
        ),
        AttributeValue::B(blob) => {
            Value::String(general_purpose::STANDARD.encode(blob.as_ref()))
        }
        AttributeValue::Bs(blobs) => Value::Array(
            blobs
                .iter()
                .map(|blob| Value::String(general_purpose::STANDARD.encode(blob.as_ref())))
                .collect(),
        ),
        _ => Value::Null,
    }
}
