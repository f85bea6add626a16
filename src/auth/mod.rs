//! Stateless session authentication.
//!
//! A signed token in the `access_token` cookie carries the user's identity and
//! the version counter it was issued against. Tokens expire after 24 hours;
//! the middleware renews expired but otherwise valid tokens transparently.
//! Bumping a user's version revokes every token issued before the bump.
//! State-changing routes additionally require a CSRF token in a header.

mod cookie;
mod csrf;
mod errors;
mod middleware;
mod session;
mod state;
mod types;

pub use cookie::{
    CookiePolicy, DEFAULT_COOKIE_MAX_AGE_SECS, SESSION_COOKIE_NAME, append_set_cookie, get_cookie,
};
pub use csrf::{CSRF_HEADER, require_csrf, set_csrf_header};
pub use errors::{ApiAuthError, CsrfRejection};
pub use middleware::require_session;
pub use session::{CSRF_TTL_SECS, IssuedToken, SessionManager, TOKEN_TTL_SECS, unix_now};
pub use state::{HasAuthBackend, UserLookup};
pub use types::{Auth, AuthenticatedIdentity};
