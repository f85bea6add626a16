mod auth;
mod error;
mod validate;

use axum::Router;
use std::sync::Arc;

use crate::auth::{CookiePolicy, SessionManager};
use crate::db::Database;
use crate::rate_limit::RateLimitConfig;

pub use auth::AuthState;
pub use error::{ApiError, ResultExt};

/// Create the API router.
pub fn create_api_router(
    db: Database,
    sessions: Arc<SessionManager>,
    cookies: CookiePolicy,
    rate_limit_config: Arc<RateLimitConfig>,
) -> Router {
    let auth_state = AuthState {
        db,
        sessions,
        cookies,
        rate_limit_config,
    };

    Router::new().nest("/auth", auth::router(auth_state))
}
