use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// A stored account. `version` is bumped whenever credentials change,
/// invalidating every token issued before.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
    pub salt: String,
    pub version: i64,
}

#[derive(Debug)]
pub enum CreateUserError {
    /// Username is already taken
    Conflict,
    Database(sqlx::Error),
}

impl std::fmt::Display for CreateUserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreateUserError::Conflict => write!(f, "Username is already taken"),
            CreateUserError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for CreateUserError {}

impl From<sqlx::Error> for CreateUserError {
    fn from(e: sqlx::Error) -> Self {
        let unique = e
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation());
        if unique {
            CreateUserError::Conflict
        } else {
            CreateUserError::Database(e)
        }
    }
}

const SELECT_USER: &str =
    "SELECT id, username, display_name, password_hash, salt, version FROM users";

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user at version 1.
    pub async fn create(
        &self,
        username: &str,
        display_name: &str,
        password_hash: &str,
        salt: &str,
    ) -> Result<UserRecord, CreateUserError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, username, display_name, password_hash, salt, version)
             VALUES (?, ?, ?, ?, ?, 1)",
        )
        .bind(id)
        .bind(username)
        .bind(display_name)
        .bind(password_hash)
        .bind(salt)
        .execute(&self.pool)
        .await?;

        Ok(UserRecord {
            id,
            username: username.to_string(),
            display_name: display_name.to_string(),
            password_hash: password_hash.to_string(),
            salt: salt.to_string(),
            version: 1,
        })
    }

    /// Get a user by username (case-insensitive).
    pub async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as(&format!("{SELECT_USER} WHERE username = ?"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as(&format!("{SELECT_USER} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Replace the password hash and salt, bumping the version in the same statement.
    /// Returns the new version, or None if the user does not exist.
    pub async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        salt: &str,
    ) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "UPDATE users SET password_hash = ?, salt = ?, version = version + 1
             WHERE id = ? RETURNING version",
        )
        .bind(password_hash)
        .bind(salt)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    /// Bump the version, invalidating every outstanding token for this user.
    /// Returns the new version, or None if the user does not exist.
    pub async fn bump_version(&self, id: Uuid) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> =
            sqlx::query_as("UPDATE users SET version = version + 1 WHERE id = ? RETURNING version")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.0))
    }
}
