//! Rate limiting for authentication endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down password
//! guessing and signup spam.

use std::{net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

use axum::{
    extract::{ConnectInfo, Request, State, connect_info::MockConnectInfo},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use tracing::{debug, info};

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

const LOGIN_PER_SEC: NonZeroU32 = NonZeroU32::new(1).unwrap();
const LOGIN_BURST: NonZeroU32 = NonZeroU32::new(5).unwrap();
const SIGNUP_PER_MIN: NonZeroU32 = NonZeroU32::new(3).unwrap();

/// Interval between sweeps of idle per-IP buckets.
const PRUNE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Rate limiting configuration for authentication endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Per-IP limiter for login (burst of 5, one more each second)
    pub login: Arc<IpLimiter>,
    /// Per-IP limiter for signup (3 requests per minute)
    pub signup: Arc<IpLimiter>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitConfig {
    pub fn new() -> Self {
        Self::with_quotas(
            Quota::per_second(LOGIN_PER_SEC).allow_burst(LOGIN_BURST),
            Quota::per_minute(SIGNUP_PER_MIN),
        )
    }

    pub fn with_quotas(login: Quota, signup: Quota) -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(login)),
            signup: Arc::new(RateLimiter::keyed(signup)),
        }
    }

    /// Number of client IPs currently tracked across both limiters.
    pub fn tracked_clients(&self) -> usize {
        self.login.len() + self.signup.len()
    }

    /// Drop buckets that have refilled completely. Such a client is
    /// indistinguishable from one never seen, so nothing is lost.
    pub fn prune(&self) {
        self.login.retain_recent();
        self.signup.retain_recent();
        self.login.shrink_to_fit();
        self.signup.shrink_to_fit();
    }

    /// Spawn a background task that prunes idle buckets periodically.
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_pruner(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PRUNE_INTERVAL);
            loop {
                interval.tick().await;
                let before = self.tracked_clients();
                self.prune();
                let pruned = before.saturating_sub(self.tracked_clients());
                if pruned > 0 {
                    info!("Pruned {} idle rate limit buckets", pruned);
                }
            }
        })
    }
}

/// Peer address as recorded by `into_make_service_with_connect_info`,
/// or by a `MockConnectInfo` layer when the router is driven directly.
fn client_ip(request: &Request) -> Option<String> {
    let extensions = request.extensions();
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
        .or_else(|| {
            extensions
                .get::<MockConnectInfo<SocketAddr>>()
                .map(|MockConnectInfo(addr)| *addr)
        })
        .map(|addr| addr.ip().to_string())
}

fn check(limiter: &IpLimiter, request: &Request, message: &'static str) -> Result<(), Response> {
    let Some(ip) = client_ip(request) else {
        return Err((StatusCode::FORBIDDEN, "Unable to determine client IP.").into_response());
    };

    limiter.check_key(&ip).map_err(|_| {
        debug!(ip = %ip, "Rate limit exceeded");
        (StatusCode::TOO_MANY_REQUESTS, message).into_response()
    })
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match check(
        &config.login,
        &request,
        "Too many login attempts. Please wait before trying again.",
    ) {
        Ok(()) => next.run(request).await,
        Err(response) => response,
    }
}

/// Middleware for rate limiting signups.
pub async fn rate_limit_signup(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match check(
        &config.signup,
        &request,
        "Too many signup attempts. Please wait before trying again.",
    ) {
        Ok(()) => next.run(request).await,
        Err(response) => response,
    }
}
