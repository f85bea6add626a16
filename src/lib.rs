pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod error;
pub mod password;
pub mod rate_limit;
pub mod token;

use api::create_api_router;
use auth::{CookiePolicy, SessionManager};
use axum::Router;
use db::Database;
use rate_limit::RateLimitConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use token::SigningKey;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Key every session token is signed with. Lives only in memory, so a
    /// restart logs everyone out.
    pub signing_key: SigningKey,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Max-Age of the session cookie in seconds
    pub cookie_max_age_secs: u64,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    build_router(config, Arc::new(RateLimitConfig::new()))
}

fn build_router(config: &ServerConfig, rate_limits: Arc<RateLimitConfig>) -> Router {
    let sessions = Arc::new(SessionManager::new(config.signing_key.clone()));
    let cookies = CookiePolicy {
        secure: config.secure_cookies,
        max_age_secs: config.cookie_max_age_secs,
    };

    let api_router = create_api_router(config.db.clone(), sessions, cookies, rate_limits);

    Router::new().nest("/api", api_router)
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Idle rate limit buckets are pruned in the background while it runs.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let rate_limits = Arc::new(RateLimitConfig::new());
    let pruner = rate_limits.clone().spawn_pruner();

    let app = build_router(&config, rate_limits);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let result = axum::serve(listener, make_service).await;

    pruner.abort();
    result
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
