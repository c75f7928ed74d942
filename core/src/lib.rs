//! Async API client core for the todo service.
//!
//! # Overview
//! `ApiClient` signs users in, keeps their access/refresh token pair in a
//! `TokenStore`, and performs list and item CRUD against the service's JSON
//! API. Every authenticated call goes through `send_with_auth`, which attaches
//! the bearer token and, on a 401, refreshes the session once and re-sends
//! the request.
//!
//! # Design
//! - I/O sits behind the `Transport` trait. `ReqwestTransport` talks HTTP;
//!   `testing::ScriptedTransport` (behind the `testing` feature)
//!   replays canned responses in-process.
//! - Requests and responses are plain data (`HttpRequest`, `HttpResponse`),
//!   and each request carries its own Authorization header.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod json;
mod resources;
pub mod session;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

pub use client::ApiClient;
pub use config::{ClientConfig, ConfigError};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use session::Session;
pub use store::{FileTokenStore, MemoryTokenStore, TokenKey, TokenStore};
pub use types::{
    AuthResult, CreateTodoItem, CreateTodoList, LoginRequest, Priority, RefreshRequest,
    RegisterRequest, TodoItem, TodoList, UpdateTodoItem, UserProfile,
};
