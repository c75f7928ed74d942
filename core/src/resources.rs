//! Typed operations on lists, items and the user profile.
//!
//! Each operation is a method, a path and an optional payload routed through
//! `ApiClient::send_with_auth`. Anything smarter belongs in `client`.

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::types::{CreateTodoItem, CreateTodoList, TodoItem, TodoList, UpdateTodoItem, UserProfile};

impl ApiClient {
    pub async fn get_todo_lists(&self) -> Result<Vec<TodoList>, ApiError> {
        self.get("/TodoLists").await
    }

    pub async fn get_todo_list(&self, id: i64) -> Result<TodoList, ApiError> {
        self.get(&format!("/TodoLists/{id}")).await
    }

    pub async fn create_todo_list(&self, input: &CreateTodoList) -> Result<TodoList, ApiError> {
        self.send_json(HttpMethod::Post, "/TodoLists", input).await
    }

    /// `None` when the server answers with an empty body.
    pub async fn update_todo_list(&self, id: i64, input: &CreateTodoList) -> Result<Option<TodoList>, ApiError> {
        self.send_json(HttpMethod::Put, &format!("/TodoLists/{id}"), input)
            .await
    }

    /// Items of the list go with it; the server handles the cascade.
    pub async fn delete_todo_list(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/TodoLists/{id}")).await
    }

    pub async fn get_todo_items(&self, todo_list_id: i64) -> Result<Vec<TodoItem>, ApiError> {
        self.get(&format!("/TodoItems/by-list/{todo_list_id}")).await
    }

    pub async fn create_todo_item(&self, input: &CreateTodoItem) -> Result<TodoItem, ApiError> {
        self.send_json(HttpMethod::Post, "/TodoItems", input).await
    }

    pub async fn update_todo_item(&self, id: i64, input: &UpdateTodoItem) -> Result<Option<TodoItem>, ApiError> {
        self.send_json(HttpMethod::Put, &format!("/TodoItems/{id}"), input)
            .await
    }

    pub async fn delete_todo_item(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/TodoItems/{id}")).await
    }

    pub async fn get_profile(&self) -> Result<UserProfile, ApiError> {
        self.get("/Users/profile").await
    }
}
