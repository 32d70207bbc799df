//! Response-shape normalization
//!
//! Collection endpoints answer with a bare array, `{ "items": [...] }` or
//! `{ "data": [...] }` depending on the controller. Everything downstream
//! wants a flat `Vec<T>`.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Expected response shape of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    /// A collection in any of the known envelopes
    #[default]
    List,
    /// Exactly one object
    Single,
}

/// Reduce a response body to a flat list of `T`
pub fn normalize<T: DeserializeOwned>(value: Value, shape: Shape) -> Result<Vec<T>, ApiError> {
    let items = match shape {
        Shape::Single => match value {
            Value::Object(_) => vec![value],
            other => {
                return Err(ApiError::Decode(format!(
                    "expected an object, got {}",
                    kind(&other)
                )))
            }
        },
        Shape::List => unwrap_envelope(value)?,
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item)
                .map_err(|e| ApiError::Decode(format!("item {}: {}", index, e)))
        })
        .collect()
}

fn unwrap_envelope(value: Value) -> Result<Vec<Value>, ApiError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            for key in ["items", "data"] {
                match map.remove(key) {
                    Some(Value::Array(items)) => return Ok(items),
                    Some(Value::Null) => return Ok(Vec::new()),
                    Some(other) => {
                        return Err(ApiError::Decode(format!(
                            "'{}' is {}, expected an array",
                            key,
                            kind(&other)
                        )))
                    }
                    None => {}
                }
            }
            // A lone entity, as the legacy by-name search returns
            Ok(vec![Value::Object(map)])
        }
        other => Err(ApiError::Decode(format!(
            "expected a list, got {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    fn items() -> Value {
        json!([{"id": 1}, {"id": 2}, {"id": 3}])
    }

    #[test]
    fn test_all_envelopes_normalize_identically() {
        let bare: Vec<Item> = normalize(items(), Shape::List).unwrap();
        let wrapped_items: Vec<Item> = normalize(json!({"items": items()}), Shape::List).unwrap();
        let wrapped_data: Vec<Item> = normalize(json!({"data": items()}), Shape::List).unwrap();

        assert_eq!(bare, vec![Item { id: 1 }, Item { id: 2 }, Item { id: 3 }]);
        assert_eq!(bare, wrapped_items);
        assert_eq!(bare, wrapped_data);
    }

    #[test]
    fn test_paged_envelope_with_metadata() {
        let body = json!({"items": [{"id": 7}], "totalCount": 40, "page": 2});
        let list: Vec<Item> = normalize(body, Shape::List).unwrap();
        assert_eq!(list, vec![Item { id: 7 }]);
    }

    #[test]
    fn test_single_object_becomes_one_item() {
        let list: Vec<Item> = normalize(json!({"id": 9}), Shape::List).unwrap();
        assert_eq!(list, vec![Item { id: 9 }]);

        let list: Vec<Item> = normalize(json!({"id": 9}), Shape::Single).unwrap();
        assert_eq!(list, vec![Item { id: 9 }]);
    }

    #[test]
    fn test_null_and_empty() {
        let list: Vec<Item> = normalize(Value::Null, Shape::List).unwrap();
        assert!(list.is_empty());

        let list: Vec<Item> = normalize(json!({"items": []}), Shape::List).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_unexpected_shapes_are_decode_errors() {
        let err = normalize::<Item>(json!("nope"), Shape::List).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));

        let err = normalize::<Item>(json!({"items": 3}), Shape::List).unwrap_err();
        assert!(matches!(err, ApiError::Decode(ref m) if m.contains("'items'")));

        let err = normalize::<Item>(json!([1, 2]), Shape::Single).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_bad_item_reports_index() {
        let err = normalize::<Item>(json!([{"id": 1}, {"id": "x"}]), Shape::List).unwrap_err();
        match err {
            ApiError::Decode(message) => assert!(message.starts_with("item 1")),
            other => panic!("expected decode error, got {:?}", other),
        }
    }
}
