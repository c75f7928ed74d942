//! Authenticated HTTP client for the todo API.
//!
//! # Design
//! `ApiClient` owns the session (access + refresh token) and is the only
//! place that mutates it. Each request is built fresh with an Authorization
//! header copied from the session at dispatch time; there is no shared
//! default header that other calls could change underneath it.
//!
//! `send_with_auth` makes at most one recovery attempt: on a 401, and only
//! when a refresh token is held, it refreshes the session and re-sends the
//! original request once. Login, register and refresh themselves go through
//! the raw path and never trigger a refresh.
//!
//! Concurrent requests that hit 401 at the same time each run their own
//! refresh; refreshes are not coalesced.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::json;
use crate::session::Session;
use crate::store::{TokenKey, TokenStore};
use crate::types::{AuthResult, LoginRequest, RefreshRequest, RegisterRequest};

pub const REGISTER_PATH: &str = "/Auth/register";
pub const LOGIN_PATH: &str = "/Auth/login";
pub const REFRESH_PATH: &str = "/Auth/refresh";

/// Async client that attaches bearer tokens and refreshes them on 401.
pub struct ApiClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
    session: RwLock<Session>,
}

impl ApiClient {
    /// Build a client and rehydrate the session from `store`.
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        let session = Session::load(store.as_ref());
        tracing::debug!(
            authenticated = session.access_token.is_some(),
            "session restored from token store"
        );
        Self {
            config,
            transport,
            store,
            session: RwLock::new(session),
        }
    }

    /// Build a client that talks HTTP through `reqwest`.
    pub fn with_reqwest(config: ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config.timeout())?;
        Ok(Self::new(config, Arc::new(transport), store))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Snapshot of the tokens currently held.
    pub async fn session(&self) -> Session {
        self.session.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.bearer().is_some()
    }

    /// Username saved by the last successful login or register.
    pub fn last_username(&self) -> Option<String> {
        self.store.get(TokenKey::Username)
    }

    // -----------------------------------------------------------------------
    // Authenticated path
    // -----------------------------------------------------------------------

    /// Send `body` as JSON to `path` with the current bearer token and decode
    /// the response into `T`.
    ///
    /// A blank response body yields `T::default()`. A 401 is retried once
    /// after a successful refresh; if no refresh is possible or it fails, the
    /// call ends in `ApiError::AuthExpired`.
    pub async fn send_with_auth<T, B>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Default,
        B: Serialize + ?Sized,
    {
        let body = body.map(json::encode).transpose()?;
        let response = self.dispatch_with_refresh(method, path, body).await?;
        json::decode_body(&response.body)
    }

    pub(crate) async fn get<T>(&self, path: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Default,
    {
        self.send_with_auth(HttpMethod::Get, path, None::<&()>).await
    }

    pub(crate) async fn send_json<T, B>(&self, method: HttpMethod, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Default,
        B: Serialize + ?Sized,
    {
        self.send_with_auth(method, path, Some(body)).await
    }

    /// Delete `path`, discarding whatever body the server sends back.
    pub(crate) async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send_with_auth::<serde_json::Value, ()>(HttpMethod::Delete, path, None)
            .await
            .map(|_| ())
    }

    async fn dispatch_with_refresh(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<String>,
    ) -> Result<HttpResponse, ApiError> {
        let bearer = self.session.read().await.bearer();
        let response = self
            .dispatch(self.build_request(method, path, body.clone(), bearer))
            .await?;
        if !response.is_unauthorized() {
            return check_status(response);
        }

        if !self.session.read().await.has_refresh_token() {
            tracing::debug!(%path, "401 with no refresh token held");
            return Err(ApiError::AuthExpired {
                body: response.body,
            });
        }

        let refreshed = self.refresh().await?;
        if !refreshed.success {
            return Err(ApiError::AuthExpired {
                body: response.body,
            });
        }

        let bearer = self.session.read().await.bearer();
        let retry = self
            .dispatch(self.build_request(method, path, body, bearer))
            .await?;
        check_status(retry)
    }

    // -----------------------------------------------------------------------
    // Raw path: login, register, refresh
    // -----------------------------------------------------------------------

    /// Log in and, on success, store the returned tokens.
    ///
    /// A rejected login is not an error: it comes back as an `AuthResult`
    /// with `success == false` and the server's `error_message`, and the
    /// session is left untouched.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResult, ApiError> {
        let result = self.auth_exchange(LOGIN_PATH, request).await?;
        Ok(self.settle_sign_in(result, "login").await)
    }

    /// Register a new account; behaves like `login` on the returned result.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResult, ApiError> {
        let result = self.auth_exchange(REGISTER_PATH, request).await?;
        Ok(self.settle_sign_in(result, "register").await)
    }

    /// Exchange the held token pair for a new one.
    ///
    /// Without both tokens no request is made. Any failure other than a
    /// transport error is reported as `success == false` and the held tokens
    /// stay as they were; clearing them is `clear_tokens`' job.
    pub async fn refresh(&self) -> Result<AuthResult, ApiError> {
        let Some((token, refresh_token)) = self.session.read().await.refresh_pair() else {
            return Ok(AuthResult::failure("no tokens to refresh"));
        };

        let request = RefreshRequest {
            token,
            refresh_token,
        };
        let result = match self.auth_exchange(REFRESH_PATH, &request).await {
            Ok(result) => result,
            Err(e @ (ApiError::Network(_) | ApiError::Timeout)) => return Err(e),
            Err(e) => AuthResult::failure(e.to_string()),
        };

        let result = self.apply_tokens(result).await;
        if result.success {
            tracing::info!("access token refreshed");
        } else {
            tracing::warn!(reason = %result.error_message, "token refresh failed");
        }
        Ok(result)
    }

    /// Forget both tokens, in memory and in storage. Safe to call when no
    /// session exists.
    pub async fn clear_tokens(&self) {
        let mut session = self.session.write().await;
        session.clear(self.store.as_ref());
        tracing::debug!("session tokens cleared");
    }

    /// `clear_tokens` plus the stored display username.
    pub async fn logout(&self) {
        self.clear_tokens().await;
        self.store.remove(TokenKey::Username);
        tracing::info!("signed out");
    }

    async fn auth_exchange<B: Serialize + ?Sized>(&self, path: &str, payload: &B) -> Result<AuthResult, ApiError> {
        let body = json::encode(payload)?;
        let response = self
            .dispatch(self.build_request(HttpMethod::Post, path, Some(body), None))
            .await?;
        decode_auth_result(response)
    }

    async fn settle_sign_in(&self, result: AuthResult, action: &str) -> AuthResult {
        let result = self.apply_tokens(result).await;
        if result.success {
            if !result.user.username.is_empty() {
                self.store.set(TokenKey::Username, &result.user.username);
            }
            tracing::info!(user = %result.user.username, "{action} succeeded");
        } else {
            tracing::debug!(reason = %result.error_message, "{action} rejected");
        }
        result
    }

    /// Apply the tokens of a successful result to the session. A result that
    /// claims success without both tokens is downgraded to a failure so the
    /// pair is never updated by halves.
    async fn apply_tokens(&self, result: AuthResult) -> AuthResult {
        if !result.success {
            return result;
        }
        if !result.carries_tokens() {
            return AuthResult::failure("authentication response carried no tokens");
        }
        let mut session = self.session.write().await;
        session.apply(self.store.as_ref(), &result.access_token, &result.refresh_token);
        result
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<String>,
        bearer: Option<String>,
    ) -> HttpRequest {
        let mut headers = Vec::new();
        if let Some(bearer) = bearer {
            headers.push(("authorization".to_string(), bearer));
        }
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        HttpRequest {
            method,
            url: format!("{}{path}", self.config.endpoint()),
            headers,
            body,
        }
    }

    async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = request.method;
        let url = request.url.clone();
        let response = tokio::time::timeout(self.config.timeout(), self.transport.execute(request))
            .await
            .map_err(|_| ApiError::Timeout)??;
        tracing::debug!(method = method.as_str(), %url, status = response.status, "request completed");
        Ok(response)
    }
}

/// Map a non-2xx status to `ApiError::HttpStatus`.
fn check_status(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.is_success() {
        return Ok(response);
    }
    Err(ApiError::HttpStatus {
        status: response.status,
        body: response.body,
    })
}

/// Interpret the answer of an auth endpoint.
///
/// The service reports rejected credentials as a non-2xx status whose body is
/// an `AuthResult`; any non-blank body that decodes is returned as-is,
/// whatever the status. Otherwise a non-2xx answer is an `HttpStatus` error.
fn decode_auth_result(response: HttpResponse) -> Result<AuthResult, ApiError> {
    if response.body.trim().is_empty() {
        if response.is_success() {
            return Err(ApiError::Decode("empty authentication response".to_string()));
        }
        return Err(ApiError::HttpStatus {
            status: response.status,
            body: response.body,
        });
    }
    match json::decode_json::<AuthResult>(&response.body) {
        Ok(result) => Ok(result),
        Err(e) if response.is_success() => Err(e),
        Err(_) => Err(ApiError::HttpStatus {
            status: response.status,
            body: response.body,
        }),
    }
}
