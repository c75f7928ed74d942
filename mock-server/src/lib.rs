use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    extract::{FromRequestParts, Path, State},
    http::{header, request::Parts, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub valid_to: Option<DateTime<Utc>>,
    pub user: Option<UserDto>,
    pub error_message: Option<String>,
}

impl AuthResponse {
    fn failure(message: &str) -> Self {
        Self {
            success: false,
            token: None,
            refresh_token: None,
            valid_to: None,
            user: None,
            error_message: Some(message.to_string()),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email_or_username: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub token: String,
    pub refresh_token: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoList {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<TodoItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub priority: u8,
    pub todo_list_id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoList {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoItem {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default = "default_priority")]
    pub priority: u8,
    pub todo_list_id: i64,
}

fn default_priority() -> u8 {
    2
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoItem {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<u8>,
    pub is_completed: Option<bool>,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

struct User {
    profile: UserDto,
    password: String,
}

struct AccessGrant {
    user_id: i64,
    expires_at: DateTime<Utc>,
}

struct RefreshGrant {
    user_id: i64,
    access_token: String,
}

struct ListRecord {
    owner_id: i64,
    list: TodoList,
}

#[derive(Default)]
struct Db {
    next_id: i64,
    users: HashMap<i64, User>,
    lists: HashMap<i64, ListRecord>,
    items: HashMap<i64, TodoItem>,
    access: HashMap<String, AccessGrant>,
    refresh: HashMap<String, RefreshGrant>,
}

impl Db {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn issue_tokens(&mut self, user_id: i64, ttl: Duration) -> (String, String, DateTime<Utc>) {
        let access_token = Uuid::new_v4().simple().to_string();
        let refresh_token = Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now() + ttl;
        self.access.insert(
            access_token.clone(),
            AccessGrant {
                user_id,
                expires_at,
            },
        );
        self.refresh.insert(
            refresh_token.clone(),
            RefreshGrant {
                user_id,
                access_token: access_token.clone(),
            },
        );
        (access_token, refresh_token, expires_at)
    }

    fn auth_success(&mut self, user_id: i64, ttl: Duration) -> AuthResponse {
        let (token, refresh_token, valid_to) = self.issue_tokens(user_id, ttl);
        AuthResponse {
            success: true,
            token: Some(token),
            refresh_token: Some(refresh_token),
            valid_to: Some(valid_to),
            user: self.users.get(&user_id).map(|u| u.profile.clone()),
            error_message: None,
        }
    }

    fn owned_list(&self, owner_id: i64, id: i64) -> Option<&ListRecord> {
        self.lists.get(&id).filter(|r| r.owner_id == owner_id)
    }

    fn list_with_items(&self, record: &ListRecord) -> TodoList {
        let mut list = record.list.clone();
        list.items = self
            .items
            .values()
            .filter(|item| item.todo_list_id == list.id)
            .cloned()
            .collect();
        list.items.sort_by_key(|item| item.id);
        list
    }
}

/// Shared server state. Clones share the same in-memory database.
#[derive(Clone)]
pub struct AppState {
    db: Arc<RwLock<Db>>,
    access_ttl: Duration,
    refresh_calls: Arc<AtomicUsize>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Duration::minutes(15))
    }
}

impl AppState {
    pub fn new(access_ttl: Duration) -> Self {
        Self {
            db: Arc::new(RwLock::new(Db::default())),
            access_ttl,
            refresh_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make every access token issued so far invalid. Refresh tokens stay
    /// usable.
    pub async fn expire_access_tokens(&self) {
        let mut db = self.db.write().await;
        let past = Utc::now() - Duration::seconds(1);
        for grant in db.access.values_mut() {
            grant.expires_at = past;
        }
    }

    /// Number of calls to `POST /api/Auth/refresh` so far.
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
pub struct CurrentUser(pub i64);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;
        let db = state.db.read().await;
        match db.access.get(token) {
            Some(grant) if grant.expires_at > Utc::now() => Ok(CurrentUser(grant.user_id)),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn app() -> Router {
    app_with_state(AppState::default())
}

pub fn app_with_state(state: AppState) -> Router {
    let api = Router::new()
        .route("/Auth/register", post(register))
        .route("/Auth/login", post(login))
        .route("/Auth/refresh", post(refresh))
        .route("/TodoLists", get(list_todo_lists).post(create_todo_list))
        .route(
            "/TodoLists/{id}",
            get(get_todo_list).put(update_todo_list).delete(delete_todo_list),
        )
        .route("/TodoItems", post(create_todo_item))
        .route("/TodoItems/by-list/{list_id}", get(list_todo_items))
        .route("/TodoItems/{id}", put(update_todo_item).delete(delete_todo_item))
        .route("/Users/profile", get(profile));
    Router::new().nest("/api", api).with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::default()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

// ---------------------------------------------------------------------------
// Auth handlers
// ---------------------------------------------------------------------------

type AuthReply = (StatusCode, Json<AuthResponse>);

async fn register(State(state): State<AppState>, Json(input): Json<RegisterRequest>) -> AuthReply {
    if input.username.trim().is_empty() || input.email.trim().is_empty() || input.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(AuthResponse::failure("Username, email and password are required")),
        );
    }
    let mut db = state.db.write().await;
    let taken = db.users.values().any(|u| {
        u.profile.username.eq_ignore_ascii_case(&input.username)
            || u.profile.email.eq_ignore_ascii_case(&input.email)
    });
    if taken {
        return (
            StatusCode::BAD_REQUEST,
            Json(AuthResponse::failure("User already exists")),
        );
    }
    let id = db.next_id();
    db.users.insert(
        id,
        User {
            profile: UserDto {
                id,
                username: input.username,
                email: input.email,
                role: "User".to_string(),
            },
            password: input.password,
        },
    );
    tracing::info!(user_id = id, "user registered");
    (StatusCode::OK, Json(db.auth_success(id, state.access_ttl)))
}

async fn login(State(state): State<AppState>, Json(input): Json<LoginRequest>) -> AuthReply {
    let mut db = state.db.write().await;
    let user_id = db
        .users
        .values()
        .find(|u| {
            (u.profile.username.eq_ignore_ascii_case(&input.email_or_username)
                || u.profile.email.eq_ignore_ascii_case(&input.email_or_username))
                && u.password == input.password
        })
        .map(|u| u.profile.id);
    match user_id {
        Some(id) => {
            tracing::info!(user_id = id, "user logged in");
            (StatusCode::OK, Json(db.auth_success(id, state.access_ttl)))
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(AuthResponse::failure("Invalid credentials")),
        ),
    }
}

/// Rotates the pair: the presented refresh token is consumed and must belong
/// to the presented access token, expired or not.
async fn refresh(State(state): State<AppState>, Json(input): Json<RefreshRequest>) -> AuthReply {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let mut db = state.db.write().await;
    let valid = db
        .refresh
        .get(&input.refresh_token)
        .is_some_and(|grant| grant.access_token == input.token);
    let grant = match valid.then(|| db.refresh.remove(&input.refresh_token)).flatten() {
        Some(grant) => grant,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(AuthResponse::failure("Invalid token")),
            )
        }
    };
    db.access.remove(&grant.access_token);
    tracing::info!(user_id = grant.user_id, "token pair rotated");
    (StatusCode::OK, Json(db.auth_success(grant.user_id, state.access_ttl)))
}

async fn profile(State(state): State<AppState>, CurrentUser(user_id): CurrentUser) -> Result<Json<UserDto>, StatusCode> {
    let db = state.db.read().await;
    db.users
        .get(&user_id)
        .map(|u| Json(u.profile.clone()))
        .ok_or(StatusCode::NOT_FOUND)
}

// ---------------------------------------------------------------------------
// List handlers
// ---------------------------------------------------------------------------

async fn list_todo_lists(State(state): State<AppState>, CurrentUser(user_id): CurrentUser) -> Json<Vec<TodoList>> {
    let db = state.db.read().await;
    let mut lists: Vec<TodoList> = db
        .lists
        .values()
        .filter(|r| r.owner_id == user_id)
        .map(|r| db.list_with_items(r))
        .collect();
    lists.sort_by_key(|l| l.id);
    Json(lists)
}

async fn get_todo_list(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<TodoList>, StatusCode> {
    let db = state.db.read().await;
    db.owned_list(user_id, id)
        .map(|r| Json(db.list_with_items(r)))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn create_todo_list(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(input): Json<CreateTodoList>,
) -> Result<(StatusCode, Json<TodoList>), StatusCode> {
    if input.title.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mut db = state.db.write().await;
    let list = TodoList {
        id: db.next_id(),
        title: input.title,
        description: input.description,
        created_at: Utc::now(),
        updated_at: None,
        items: Vec::new(),
    };
    db.lists.insert(
        list.id,
        ListRecord {
            owner_id: user_id,
            list: list.clone(),
        },
    );
    Ok((StatusCode::CREATED, Json(list)))
}

async fn update_todo_list(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<CreateTodoList>,
) -> Result<Json<TodoList>, StatusCode> {
    if input.title.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mut db = state.db.write().await;
    let record = db
        .lists
        .get_mut(&id)
        .filter(|r| r.owner_id == user_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    record.list.title = input.title;
    record.list.description = input.description;
    record.list.updated_at = Some(Utc::now());
    let record = db.lists.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(db.list_with_items(record)))
}

async fn delete_todo_list(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, StatusCode> {
    let mut db = state.db.write().await;
    if db.owned_list(user_id, id).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    db.lists.remove(&id);
    db.items.retain(|_, item| item.todo_list_id != id);
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Item handlers
// ---------------------------------------------------------------------------

async fn list_todo_items(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(list_id): Path<i64>,
) -> Result<Json<Vec<TodoItem>>, StatusCode> {
    let db = state.db.read().await;
    let record = db.owned_list(user_id, list_id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(db.list_with_items(record).items))
}

async fn create_todo_item(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(input): Json<CreateTodoItem>,
) -> Result<(StatusCode, Json<TodoItem>), StatusCode> {
    if input.title.trim().is_empty() || !(1..=3).contains(&input.priority) {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mut db = state.db.write().await;
    if db.owned_list(user_id, input.todo_list_id).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    let item = TodoItem {
        id: db.next_id(),
        title: input.title,
        description: input.description,
        is_completed: false,
        created_at: Utc::now(),
        due_date: input.due_date,
        completed_at: None,
        priority: input.priority,
        todo_list_id: input.todo_list_id,
    };
    db.items.insert(item.id, item.clone());
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_todo_item(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateTodoItem>,
) -> Result<Json<TodoItem>, StatusCode> {
    if input.priority.is_some_and(|p| !(1..=3).contains(&p)) {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mut db = state.db.write().await;
    let list_id = db.items.get(&id).map(|item| item.todo_list_id).ok_or(StatusCode::NOT_FOUND)?;
    if db.owned_list(user_id, list_id).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    let item = db.items.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(title) = input.title {
        item.title = title;
    }
    if let Some(description) = input.description {
        item.description = Some(description);
    }
    if let Some(due_date) = input.due_date {
        item.due_date = Some(due_date);
    }
    if let Some(priority) = input.priority {
        item.priority = priority;
    }
    if let Some(is_completed) = input.is_completed {
        if is_completed && !item.is_completed {
            item.completed_at = Some(Utc::now());
        } else if !is_completed {
            item.completed_at = None;
        }
        item.is_completed = is_completed;
    }
    Ok(Json(item.clone()))
}

async fn delete_todo_item(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, StatusCode> {
    let mut db = state.db.write().await;
    let list_id = db.items.get(&id).map(|item| item.todo_list_id).ok_or(StatusCode::NOT_FOUND)?;
    if db.owned_list(user_id, list_id).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    db.items.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}
