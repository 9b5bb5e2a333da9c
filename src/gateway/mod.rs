//! Axum-based HTTP gateway.
//!
//! Routes:
//! - `GET /`: redirect to the static entry page
//! - `GET /health`: liveness
//! - `GET /activities`: every activity with its roster
//! - `POST /login`, `POST /logout`, `GET /profile`: cookie sessions
//! - `POST /reset-password`: rewrite a stored password hash
//! - `POST /activities/{name}/signup`, `DELETE /activities/{name}/unregister`
//!
//! Request bodies are capped at 64KB and every request has a timeout.

pub mod cookies;

use crate::activities::{Activity, ActivityRegistry};
use crate::auth::{PasswordHasher, Profile, SessionRegistry, User, UserStore};
use crate::config::Config;
use crate::error::ApiError;
use crate::policy;
use anyhow::Result;
use axum::{
    extract::{rejection::FormRejection, rejection::QueryRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
    routing::{delete, get, post},
    Form, Router,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (64KB)
pub const MAX_BODY_SIZE: usize = 65_536;

/// Where `GET /` sends browsers.
pub const ENTRY_PAGE: &str = "/static/index.html";

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserStore>,
    pub sessions: Arc<SessionRegistry>,
    pub activities: Arc<ActivityRegistry>,
    pub hasher: PasswordHasher,
    pub cookie_name: Arc<str>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            users: Arc::new(UserStore::new(&config.storage.users_file)),
            sessions: Arc::new(SessionRegistry::new()),
            activities: Arc::new(
                ActivityRegistry::with_default_catalog()
                    .enforce_capacity(config.activities.enforce_capacity),
            ),
            hasher: PasswordHasher::new(config.auth.password_iterations),
            cookie_name: Arc::from(config.auth.cookie_name.as_str()),
        }
    }

    /// The user behind the request's session cookie, if any.
    ///
    /// A session whose user has since vanished from the store counts as
    /// anonymous.
    fn current_user(&self, headers: &HeaderMap) -> Result<Option<User>, ApiError> {
        let Some(token) = cookies::read(headers, &self.cookie_name) else {
            return Ok(None);
        };
        let Some(email) = self.sessions.resolve(&token) else {
            return Ok(None);
        };
        Ok(self.users.find_by_email(&email)?)
    }
}

/// Build the router with CORS, body-limit and timeout layers.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    // CORS: any origin, no credentials
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/activities", get(handle_activities))
        .route("/login", post(handle_login))
        .route("/logout", post(handle_logout))
        .route("/profile", get(handle_profile))
        .route("/reset-password", post(handle_reset_password))
        .route("/activities/{name}/signup", post(handle_signup))
        .route("/activities/{name}/unregister", delete(handle_unregister))
        .with_state(state)
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
}

/// Run the HTTP gateway until Ctrl-C.
pub async fn run_gateway(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.gateway.host, config.gateway.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;

    let state = AppState::from_config(&config);
    match state.users.load() {
        Ok(users) => tracing::info!(
            users = users.len(),
            path = %state.users.path().display(),
            "User store loaded"
        ),
        Err(e) => tracing::warn!("User store not readable yet: {e}"),
    }

    let app = router(
        state,
        Duration::from_secs(config.gateway.request_timeout_secs),
    );

    tracing::info!("Gateway listening on http://{local}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// AXUM HANDLERS
// ══════════════════════════════════════════════════════════════════════════════

/// GET /: send browsers to the static UI.
async fn handle_root() -> Redirect {
    Redirect::temporary(ENTRY_PAGE)
}

/// GET /health: always public
async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /activities: every activity keyed by name.
async fn handle_activities(State(state): State<AppState>) -> Json<BTreeMap<String, Activity>> {
    Json(state.activities.snapshot())
}

/// Form body for login. Extra OAuth2 password-grant fields are ignored.
#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

/// POST /login: verify credentials and start a cookie session.
async fn handle_login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Response, ApiError> {
    let Form(form) = form.map_err(|e| ApiError::BadRequest(format!("Invalid request: {e}")))?;

    let user = match state.users.find_by_email(&form.username)? {
        Some(user) if state.hasher.verify(&form.password, &user.password_hash) => user,
        Some(_) => {
            tracing::info!(email = %form.username, "Login rejected: wrong password");
            return Err(ApiError::Unauthenticated("Invalid credentials".into()));
        }
        None => {
            // Dummy hash to prevent timing side-channel
            let _ = state.hasher.hash(&form.password);
            tracing::info!(email = %form.username, "Login rejected: unknown user");
            return Err(ApiError::Unauthenticated("Invalid credentials".into()));
        }
    };

    let token = state.sessions.create(&user.email);
    tracing::info!(email = %user.email, role = %user.role, "Login successful");

    let mut response = Json(serde_json::json!({
        "message": "Login successful",
        "role": user.role,
        "name": user.name,
    }))
    .into_response();
    if let Some(cookie) = cookies::session(&state.cookie_name, &token) {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

/// POST /logout: always succeeds, with or without a live session.
async fn handle_logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = cookies::read(&headers, &state.cookie_name) {
        if state.sessions.revoke(&token) {
            tracing::info!("Session revoked");
        }
    }

    let mut response = Json(serde_json::json!({ "message": "Logged out" })).into_response();
    if let Some(cookie) = cookies::removal(&state.cookie_name) {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

/// GET /profile: the logged-in user without the password hash.
async fn handle_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Profile>, ApiError> {
    state
        .current_user(&headers)?
        .map(|user| Json(Profile::from(&user)))
        .ok_or_else(|| ApiError::Unauthenticated("Not authenticated".into()))
}

#[derive(Deserialize)]
struct ResetPasswordQuery {
    email: String,
    new_password: String,
}

/// POST /reset-password?email=&new_password=: no session required.
async fn handle_reset_password(
    State(state): State<AppState>,
    query: Result<Query<ResetPasswordQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(format!("Invalid request: {e}")))?;

    let hash = state.hasher.hash(&query.new_password);
    if !state.users.set_password_hash(&query.email, &hash)? {
        return Err(ApiError::NotFound("User not found".into()));
    }
    tracing::info!(email = %query.email, "Password reset");
    Ok(Json(
        serde_json::json!({ "message": "Password reset successful" }),
    ))
}

#[derive(Deserialize)]
struct StudentQuery {
    email: String,
}

/// POST /activities/{name}/signup?email=
async fn handle_signup(
    State(state): State<AppState>,
    Path(name): Path<String>,
    query: Result<Query<StudentQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Query(StudentQuery { email }) =
        query.map_err(|e| ApiError::BadRequest(format!("Invalid request: {e}")))?;

    authorize_registration_change(&state, &headers, &name, &email, "register")?;
    state.activities.signup(&name, &email)?;

    tracing::info!(activity = %name, email = %email, "Signed up");
    Ok(Json(serde_json::json!({
        "message": format!("Signed up {email} for {name}"),
    })))
}

/// DELETE /activities/{name}/unregister?email=
async fn handle_unregister(
    State(state): State<AppState>,
    Path(name): Path<String>,
    query: Result<Query<StudentQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Query(StudentQuery { email }) =
        query.map_err(|e| ApiError::BadRequest(format!("Invalid request: {e}")))?;

    authorize_registration_change(&state, &headers, &name, &email, "unregister")?;
    state.activities.unregister(&name, &email)?;

    tracing::info!(activity = %name, email = %email, "Unregistered");
    Ok(Json(serde_json::json!({
        "message": format!("Unregistered {email} from {name}"),
    })))
}

/// Unknown activity is reported before the permission check, and the
/// permission check before any roster check.
fn authorize_registration_change(
    state: &AppState,
    headers: &HeaderMap,
    activity: &str,
    target_email: &str,
    verb: &str,
) -> Result<(), ApiError> {
    if !state.activities.contains(activity) {
        return Err(ApiError::NotFound("Activity not found".into()));
    }
    let actor = state.current_user(headers)?;
    if !policy::can_manage_registration(actor.as_ref(), target_email) {
        tracing::warn!(
            actor = actor.as_ref().map_or("anonymous", |u| u.email.as_str()),
            target = %target_email,
            activity = %activity,
            "Registration change denied"
        );
        return Err(ApiError::Forbidden(format!(
            "Not authorized to {verb} this student"
        )));
    }
    Ok(())
}
