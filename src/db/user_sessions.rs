use chrono::{Duration, NaiveDateTime, Utc};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::{
    auth::{DbUserSession, UserSession},
    error::AppError,
};

#[instrument(skip(pool, token))]
pub async fn create_user_session(
    pool: &Pool<Sqlite>,
    user_id: i64,
    token: &str,
    expires_at: NaiveDateTime,
) -> Result<i64, AppError> {
    info!("Creating user session");
    let now = Utc::now().naive_utc();

    let res = sqlx::query(
        "INSERT INTO user_sessions (user_id, token, created_at, last_activity, expires_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(token)
    .bind(now)
    .bind(now)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, token))]
pub async fn get_session_by_token(
    pool: &Pool<Sqlite>,
    token: &str,
) -> Result<UserSession, AppError> {
    let session = sqlx::query_as::<_, DbUserSession>(
        "SELECT id, user_id, token, created_at, last_activity, expires_at
         FROM user_sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    match session {
        Some(session) => Ok(UserSession::from(session)),
        _ => Err(AppError::Authentication(
            "Invalid session token".to_string(),
        )),
    }
}

#[instrument(skip(pool, token))]
pub async fn touch_session(
    pool: &Pool<Sqlite>,
    token: &str,
    at: NaiveDateTime,
) -> Result<(), AppError> {
    sqlx::query("UPDATE user_sessions SET last_activity = ? WHERE token = ?")
        .bind(at)
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip(pool, token))]
pub async fn invalidate_session(pool: &Pool<Sqlite>, token: &str) -> Result<(), AppError> {
    info!("Invalidating session");

    sqlx::query("DELETE FROM user_sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

/// Removes sessions past their absolute expiry or idle for longer than
/// `idle_timeout`.
#[instrument(skip(pool))]
pub async fn clean_expired_sessions(
    pool: &Pool<Sqlite>,
    idle_timeout: Duration,
) -> Result<u64, AppError> {
    info!("Cleaning expired sessions");

    let now = Utc::now().naive_utc();
    let idle_cutoff = now - idle_timeout;

    let result =
        sqlx::query("DELETE FROM user_sessions WHERE expires_at < ? OR last_activity < ?")
            .bind(now)
            .bind(idle_cutoff)
            .execute(pool)
            .await?;

    Ok(result.rows_affected())
}
