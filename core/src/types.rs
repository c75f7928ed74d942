//! Domain DTOs for the todo API.
//!
//! # Design
//! These types mirror the service's JSON schema but are defined independently
//! of the mock-server crate; integration tests catch drift between the two.
//!
//! Payloads are written in camelCase. Responses are decoded after their keys
//! have been lower-cased (see `json::decode_json`), so every struct declares
//! lower-case deserialize names and a payload spelled `TodoListId`,
//! `todoListId` or `todolistid` lands in the same field.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Payload for `POST /Auth/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Payload for `POST /Auth/login`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email_or_username: String,
    pub password: String,
}

/// Payload for `POST /Auth/refresh`: the expired access token and its
/// refresh token, sent together.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub token: String,
    pub refresh_token: String,
}

/// Outcome of a login, register or refresh exchange.
///
/// `success == false` means the tokens must not be applied; `error_message`
/// then explains why.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct AuthResult {
    #[serde(default)]
    pub success: bool,
    #[serde(rename = "token", default, deserialize_with = "null_as_default")]
    pub access_token: String,
    #[serde(rename(deserialize = "refreshtoken"), alias = "refreshToken", default, deserialize_with = "null_as_default")]
    pub refresh_token: String,
    #[serde(rename(deserialize = "validto"), alias = "validTo", default, with = "wire_time::option")]
    pub valid_to: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user: UserProfile,
    #[serde(rename(deserialize = "errormessage"), alias = "errorMessage", default, deserialize_with = "null_as_default")]
    pub error_message: String,
}

impl AuthResult {
    /// A failed result produced locally, without a server round-trip.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: message.into(),
            ..Self::default()
        }
    }

    /// True when the result may be applied to the session: the server
    /// reported success and handed back both tokens.
    pub fn carries_tokens(&self) -> bool {
        self.success && !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}

/// The signed-in user as the server describes it. `role` is display-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct UserProfile {
    #[serde(default)]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
}

// ---------------------------------------------------------------------------
// Lists and items
// ---------------------------------------------------------------------------

/// Task priority. On the wire it is the number 1, 2 or 3.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn wire_value(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    pub fn from_wire(value: u64) -> Option<Self> {
        match value {
            1 => Some(Priority::Low),
            2 => Some(Priority::Medium),
            3 => Some(Priority::High),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.wire_value())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Number(n) => n
                .as_u64()
                .and_then(Priority::from_wire)
                .ok_or_else(|| de::Error::custom(format!("unknown priority value {n}"))),
            serde_json::Value::String(s) => Priority::from_name(&s)
                .ok_or_else(|| de::Error::custom(format!("unknown priority name {s:?}"))),
            serde_json::Value::Null => Ok(Priority::default()),
            other => Err(de::Error::custom(format!("invalid priority {other}"))),
        }
    }
}

/// A todo list with its items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct TodoList {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename(deserialize = "createdat"), alias = "createdAt", default, with = "wire_time")]
    pub created_at: DateTime<Utc>,
    #[serde(rename(deserialize = "updatedat"), alias = "updatedAt", default, with = "wire_time::option")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<TodoItem>,
}

/// A single task inside a list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct TodoItem {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename(deserialize = "iscompleted"), alias = "isCompleted", default)]
    pub is_completed: bool,
    #[serde(rename(deserialize = "createdat"), alias = "createdAt", default, with = "wire_time")]
    pub created_at: DateTime<Utc>,
    #[serde(rename(deserialize = "duedate"), alias = "dueDate", default, with = "wire_time::option")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(rename(deserialize = "completedat"), alias = "completedAt", default, with = "wire_time::option")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(rename(deserialize = "todolistid"), alias = "todoListId", default)]
    pub todo_list_id: i64,
}

/// Payload for `POST /TodoLists` and `PUT /TodoLists/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoList {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Payload for `POST /TodoItems`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoItem {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub todo_list_id: i64,
}

impl CreateTodoItem {
    /// A new task with default priority and no description or due date.
    pub fn new(todo_list_id: i64, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            due_date: None,
            priority: Priority::default(),
            todo_list_id,
        }
    }
}

/// Payload for `PUT /TodoItems/{id}`. Only the fields present in the JSON are
/// applied; omitted fields keep their server-side values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

impl UpdateTodoItem {
    /// Flip the completion flag of `item`. The known title and description
    /// travel with the flag so the server never blanks them.
    pub fn completion_toggle(item: &TodoItem) -> Self {
        Self {
            title: Some(item.title.clone()),
            description: item.description.clone(),
            is_completed: Some(!item.is_completed),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Wire helpers
// ---------------------------------------------------------------------------

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Timestamps as the service writes them: RFC 3339, or ISO 8601 without an
/// offset, which is read as UTC.
mod wire_time {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        option::deserialize(deserializer).map(Option::unwrap_or_default)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) => parse(&raw)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid timestamp {raw:?}"))),
            }
        }
    }
}
