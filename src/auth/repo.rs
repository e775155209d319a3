use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub created_at: OffsetDateTime,
    pub last_login: Option<OffsetDateTime>,
    pub is_active: bool,
}

impl User {
    /// Insert a new user. The unique constraint on `username` is the
    /// authoritative duplicate check; violations surface as a database error.
    pub async fn create(
        db: &SqlitePool,
        username: &str,
        password_hash: &str,
        full_name: Option<&str>,
    ) -> sqlx::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, full_name, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, username, password_hash, full_name, created_at, last_login, is_active
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(full_name)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Find an active user by exact, case-sensitive username.
    pub async fn find_by_username(db: &SqlitePool, username: &str) -> sqlx::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, full_name, created_at, last_login, is_active
            FROM users
            WHERE username = ? AND is_active = 1
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Whether any row (active or not) holds this username. Pre-check only;
    /// the unique constraint spans all rows regardless of `is_active`.
    pub async fn username_exists(db: &SqlitePool, username: &str) -> sqlx::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)"#,
        )
        .bind(username)
        .fetch_one(db)
        .await?;
        Ok(exists)
    }

    /// Record a successful login. No-op when the username does not exist.
    pub async fn update_last_login(
        db: &SqlitePool,
        username: &str,
        timestamp: OffsetDateTime,
    ) -> sqlx::Result<()> {
        sqlx::query(r#"UPDATE users SET last_login = ? WHERE username = ?"#)
            .bind(timestamp)
            .bind(username)
            .execute(db)
            .await?;
        Ok(())
    }
}
