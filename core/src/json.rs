//! JSON decoding with case-insensitive property names.
//!
//! Object keys are lower-cased recursively before the value is handed to
//! serde, and the DTOs in `types` declare lower-case deserialize names.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Decode a response body, yielding `T::default()` for a blank body or a
/// bare `null`.
pub fn decode_body<T: DeserializeOwned + Default>(body: &str) -> Result<T, ApiError> {
    if body.trim().is_empty() {
        return Ok(T::default());
    }
    let value = parse(body)?;
    if value.is_null() {
        return Ok(T::default());
    }
    from_value(value)
}

/// Decode a non-empty JSON document.
pub fn decode_json<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    from_value(parse(body)?)
}

pub fn encode<T: serde::Serialize + ?Sized>(payload: &T) -> Result<String, ApiError> {
    serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))
}

fn parse(body: &str) -> Result<Value, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(lowercase_keys(value)).map_err(|e| ApiError::Decode(e.to_string()))
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key.to_lowercase(), lowercase_keys(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuthResult, Priority, TodoItem, TodoList};

    #[test]
    fn blank_body_yields_default() {
        let lists: Vec<TodoList> = decode_body("").unwrap();
        assert!(lists.is_empty());
        let list: Option<TodoList> = decode_body("  \n\t").unwrap();
        assert!(list.is_none());
        let lists: Vec<TodoList> = decode_body("null").unwrap();
        assert!(lists.is_empty());
    }

    #[test]
    fn property_names_match_regardless_of_case() {
        let body = r#"{
            "Id": 5,
            "TITLE": "Walk dog",
            "isCompleted": true,
            "CreatedAt": "2024-01-01T10:00:00Z",
            "DUEDATE": null,
            "Priority": 3,
            "todolistid": 1
        }"#;
        let item: TodoItem = decode_body(body).unwrap();
        assert_eq!(item.id, 5);
        assert_eq!(item.title, "Walk dog");
        assert!(item.is_completed);
        assert_eq!(item.priority, Priority::High);
        assert_eq!(item.todo_list_id, 1);
        assert!(item.due_date.is_none());
    }

    #[test]
    fn nested_keys_are_normalised() {
        let body = r#"{"Success":true,"Token":"A1","RefreshToken":"R1",
            "User":{"Id":1,"UserName":"alice","Email":"a@example.com","Role":"User"}}"#;
        let result: AuthResult = decode_json(body).unwrap();
        assert!(result.carries_tokens());
        assert_eq!(result.access_token, "A1");
        assert_eq!(result.refresh_token, "R1");
        assert_eq!(result.user.username, "alice");
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let err = decode_body::<Vec<TodoList>>("not json").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn wrong_shape_is_a_decode_error() {
        let err = decode_body::<Vec<TodoList>>(r#"{"id":1}"#).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
