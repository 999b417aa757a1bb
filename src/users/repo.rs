use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_verified: bool,
    pub is_admin: bool,
    // Reset credentials exist in the schema but no route uses them yet.
    pub forgot_password_token: Option<String>,
    pub forgot_password_token_expiry: Option<OffsetDateTime>,
    pub verify_token: Option<String>,
    pub verify_token_expiry: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const USER_COLUMNS: &str = r#"
    id, username, email, password_hash, is_verified, is_admin,
    forgot_password_token, forgot_password_token_expiry,
    verify_token, verify_token_expiry, created_at, updated_at
"#;

/// Find a user by email.
pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE email = $1
        "#,
    ))
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Find a user by id.
pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE id = $1
        "#,
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Find a user holding either the given username or the given email, for the
/// signup duplicate pre-check.
pub async fn find_by_username_or_email(
    db: &PgPool,
    username: &str,
    email: &str,
) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE username = $1 OR email = $2
        "#,
    ))
    .bind(username)
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Create a new user with a hashed password and a pending verification token.
pub async fn create(
    db: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
    verify_token: &str,
    verify_token_expiry: OffsetDateTime,
) -> anyhow::Result<User> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (username, email, password_hash, verify_token, verify_token_expiry)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {USER_COLUMNS}
        "#,
    ))
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(verify_token)
    .bind(verify_token_expiry)
    .fetch_one(db)
    .await?;
    Ok(user)
}

/// Consume a verification token: one conditional UPDATE flips the user to
/// verified and clears the token, so a replayed token matches no row. Returns
/// `None` for a wrong, already-consumed, or expired token alike.
pub async fn consume_verify_token(db: &PgPool, token: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET is_verified = TRUE, verify_token = NULL, verify_token_expiry = NULL
        WHERE verify_token = $1 AND verify_token_expiry > now()
        RETURNING {USER_COLUMNS}
        "#,
    ))
    .bind(token)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// True when the error is a Postgres unique-constraint violation.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) => {
            db_err.code().is_some_and(|code| code.as_ref() == "23505")
        }
        _ => false,
    }
}
