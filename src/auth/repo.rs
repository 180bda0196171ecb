use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: OffsetDateTime,
    pub last_login: Option<OffsetDateTime>,
}

impl User {
    /// Login lookup: the identifier may be a username or an email.
    pub async fn find_by_username_or_email(
        db: &PgPool,
        ident: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at, last_login
            FROM users
            WHERE username = $1 OR email = $1
            "#,
        )
        .bind(ident)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn exists(db: &PgPool, username: &str, email: &str) -> anyhow::Result<bool> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE username = $1 OR email = $2")
                .bind(username)
                .bind(email)
                .fetch_optional(db)
                .await?;
        Ok(row.is_some())
    }

    pub async fn create(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, created_at, last_login
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn touch_last_login(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl Session {
    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        token: &str,
        ttl: Duration,
    ) -> anyhow::Result<Session> {
        let expires_at = OffsetDateTime::now_utc() + ttl;
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (token, user_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, token, user_id, expires_at, created_at
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(db)
        .await?;
        Ok(session)
    }

    /// Resolve a token to its user, only while the session is unexpired.
    pub async fn find_valid_user(db: &PgPool, token: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.username, u.email, u.password_hash, u.created_at, u.last_login
            FROM sessions s
            JOIN users u ON s.user_id = u.id
            WHERE s.token = $1 AND s.expires_at > now()
            "#,
        )
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Idempotent hard delete (logout).
    pub async fn delete(db: &PgPool, token: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Purge expired rows; invoked by an external scheduler, never
    /// automatically.
    pub async fn cleanup_expired(db: &PgPool) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSpreadsheet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub spreadsheet_id: String,
    pub spreadsheet_name: Option<String>,
    pub created_at: OffsetDateTime,
}

impl UserSpreadsheet {
    /// Register a spreadsheet; re-registering the same id renames it.
    pub async fn upsert(
        db: &PgPool,
        user_id: Uuid,
        spreadsheet_id: &str,
        spreadsheet_name: Option<&str>,
    ) -> anyhow::Result<UserSpreadsheet> {
        let row = sqlx::query_as::<_, UserSpreadsheet>(
            r#"
            INSERT INTO user_spreadsheets (user_id, spreadsheet_id, spreadsheet_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, spreadsheet_id)
            DO UPDATE SET spreadsheet_name = EXCLUDED.spreadsheet_name
            RETURNING id, user_id, spreadsheet_id, spreadsheet_name, created_at
            "#,
        )
        .bind(user_id)
        .bind(spreadsheet_id)
        .bind(spreadsheet_name)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn list(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<UserSpreadsheet>> {
        let rows = sqlx::query_as::<_, UserSpreadsheet>(
            r#"
            SELECT id, user_id, spreadsheet_id, spreadsheet_name, created_at
            FROM user_spreadsheets
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// The spreadsheet chat and manual entry write to: the most recently
    /// registered one.
    pub async fn latest(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<UserSpreadsheet>> {
        let row = sqlx::query_as::<_, UserSpreadsheet>(
            r#"
            SELECT id, user_id, spreadsheet_id, spreadsheet_name, created_at
            FROM user_spreadsheets
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn delete(
        db: &PgPool,
        user_id: Uuid,
        spreadsheet_id: &str,
    ) -> anyhow::Result<bool> {
        let result =
            sqlx::query("DELETE FROM user_spreadsheets WHERE user_id = $1 AND spreadsheet_id = $2")
                .bind(user_id)
                .bind(spreadsheet_id)
                .execute(db)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
