use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::error::{ApiError, ResultExt};
use super::validate;
use crate::auth::{
    Auth, AuthenticatedIdentity, CookiePolicy, SESSION_COOKIE_NAME, SessionManager,
    append_set_cookie, get_cookie, require_csrf, require_session, set_csrf_header,
};
use crate::db::{CreateUserError, Database, UserRecord};
use crate::error::AuthError;
use crate::impl_has_auth_backend;
use crate::password;
use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_signup};

const BAD_CREDENTIALS: &str = "Incorrect login or password";

#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub sessions: Arc<SessionManager>,
    pub cookies: CookiePolicy,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

impl_has_auth_backend!(AuthState);

pub fn router(state: AuthState) -> Router {
    let signup_router = Router::new()
        .route("/signup", post(signup))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_signup,
        ));

    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_login,
        ));

    // Runs inside require_session, which supplies the identity.
    let mutating_router = Router::new()
        .route("/password", put(change_password))
        .route("/logout-all", post(logout_all))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_csrf::<AuthState>,
        ));

    let protected_router = Router::new()
        .route("/me", get(me))
        .merge(mutating_router)
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_session::<AuthState>,
        ));

    Router::new()
        .route("/logout", post(logout))
        .with_state(state)
        .merge(signup_router)
        .merge(login_router)
        .merge(protected_router)
}

#[derive(Deserialize)]
struct SignupRequest {
    username: String,
    name: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct ChangePasswordRequest {
    old_password: String,
    new_password: String,
}

#[derive(Serialize)]
struct SessionResponse {
    message: &'static str,
    user: AuthenticatedIdentity,
}

#[derive(Serialize)]
struct MeResponse {
    user: AuthenticatedIdentity,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

/// Mint a token for `user` and set it as the session cookie on the response,
/// with a matching CSRF token in the `X-CSRF-Token` header.
fn respond_with_session(
    state: &AuthState,
    user: &UserRecord,
    status: StatusCode,
    message: &'static str,
) -> Result<Response, ApiError> {
    let issued = state.sessions.issue(user).map_err(|e| {
        error!(error = %e, "Failed to issue session token");
        ApiError::internal("Failed to create session")
    })?;

    let identity = AuthenticatedIdentity::from(&issued.payload);
    let csrf = state.sessions.issue_csrf(&identity).map_err(|e| {
        error!(error = %e, "Failed to issue CSRF token");
        ApiError::internal("Failed to create session")
    })?;

    let body = SessionResponse {
        message,
        user: identity,
    };
    let mut response = (status, Json(body)).into_response();
    append_set_cookie(
        response.headers_mut(),
        &state.cookies.session_cookie(&issued.token),
    );
    set_csrf_header(response.headers_mut(), &csrf);
    Ok(response)
}

fn respond_clearing_session(state: &AuthState, message: &'static str) -> Response {
    let mut response = Json(MessageResponse { message }).into_response();
    append_set_cookie(response.headers_mut(), &state.cookies.clear_cookie());
    response
}

async fn signup(
    State(state): State<AuthState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Response, ApiError> {
    validate::username(&payload.username)?;
    validate::password(&payload.password)?;
    validate::display_name(&payload.name)?;

    let salt = password::generate_salt();
    let hash = password::hash_password(&payload.password, &salt);

    let user = match state
        .db
        .users()
        .create(&payload.username, &payload.name, &hash, &salt)
        .await
    {
        Ok(user) => user,
        Err(CreateUserError::Conflict) => {
            return Err(ApiError::conflict(AuthError::Conflict.to_string()));
        }
        Err(CreateUserError::Database(e)) => {
            return Err(ApiError::db_error("Failed to create user", e));
        }
    };

    info!(username = %user.username, "User registered");
    respond_with_session(&state, &user, StatusCode::CREATED, "Registration successful")
}

async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    validate::username(&payload.username)?;
    validate::password(&payload.password)?;

    let Some(user) = state
        .db
        .users()
        .get_by_username(&payload.username)
        .await
        .db_err("Failed to look up user")?
    else {
        password::dummy_verify(&payload.password);
        warn!(username = %payload.username, "Login attempt for unknown user");
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    };

    if !password::matches(&user.password_hash, &payload.password, &user.salt) {
        warn!(username = %user.username, "Failed login attempt");
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    }

    info!(username = %user.username, "User logged in");
    respond_with_session(&state, &user, StatusCode::OK, "Login successful")
}

async fn me(Auth(identity): Auth) -> Json<MeResponse> {
    Json(MeResponse { user: identity })
}

async fn logout(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if get_cookie(&headers, SESSION_COOKIE_NAME).is_none() {
        return Err(ApiError::unauthorized("Unauthorized"));
    }
    Ok(respond_clearing_session(&state, "Logout successful"))
}

async fn change_password(
    State(state): State<AuthState>,
    Auth(identity): Auth,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Response, ApiError> {
    validate::password(&payload.new_password)?;

    let user = state
        .db
        .users()
        .get_by_id(identity.user_id)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    if !password::matches(&user.password_hash, &payload.old_password, &user.salt) {
        warn!(username = %user.username, "Password change with wrong current password");
        return Err(ApiError::unauthorized("Incorrect password"));
    }

    let salt = password::generate_salt();
    let hash = password::hash_password(&payload.new_password, &salt);

    let version = state
        .db
        .users()
        .update_password(user.id, &hash, &salt)
        .await
        .db_err("Failed to update password")?
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    let user = UserRecord {
        password_hash: hash,
        salt,
        version,
        ..user
    };

    info!(username = %user.username, version, "Password changed, other sessions revoked");
    respond_with_session(&state, &user, StatusCode::OK, "Password changed")
}

async fn logout_all(
    State(state): State<AuthState>,
    Auth(identity): Auth,
) -> Result<Response, ApiError> {
    let version = state
        .db
        .users()
        .bump_version(identity.user_id)
        .await
        .db_err("Failed to revoke sessions")?
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    info!(username = %identity.username, version, "All sessions revoked");
    Ok(respond_clearing_session(&state, "Logged out everywhere"))
}
