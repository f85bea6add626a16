//! Authentication backend traits and macro.

use std::future::Future;

use super::cookie::CookiePolicy;
use super::session::SessionManager;
use crate::db::{Database, UserRecord};
use crate::error::AuthError;

/// Read access to the user store, as the session core needs it.
///
/// Absent users map to `UserNotFound`, store failures to `LookupFailed`.
pub trait UserLookup: Send + Sync {
    fn find_user(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<UserRecord, AuthError>> + Send;
}

impl UserLookup for Database {
    async fn find_user(&self, username: &str) -> Result<UserRecord, AuthError> {
        self.users()
            .get_by_username(username)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to look up user");
                AuthError::LookupFailed
            })?
            .ok_or(AuthError::UserNotFound)
    }
}

/// Trait for state types that carry what the session middleware needs.
pub trait HasAuthBackend: Clone + Send + Sync + 'static {
    type Users: UserLookup;

    fn sessions(&self) -> &SessionManager;
    fn user_lookup(&self) -> &Self::Users;
    fn cookie_policy(&self) -> &CookiePolicy;
}

/// Macro to implement `HasAuthBackend` for state structs with the standard fields.
///
/// The struct must have these fields:
/// - `sessions: Arc<SessionManager>`
/// - `db: Database`
/// - `cookies: CookiePolicy`
///
/// # Example
/// ```ignore
/// use crate::impl_has_auth_backend;
///
/// #[derive(Clone)]
/// pub struct MyState {
///     pub db: Database,
///     pub sessions: Arc<SessionManager>,
///     pub cookies: CookiePolicy,
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            type Users = $crate::db::Database;

            fn sessions(&self) -> &$crate::auth::SessionManager {
                &self.sessions
            }
            fn user_lookup(&self) -> &$crate::db::Database {
                &self.db
            }
            fn cookie_policy(&self) -> &$crate::auth::CookiePolicy {
                &self.cookies
            }
        }
    };
}
