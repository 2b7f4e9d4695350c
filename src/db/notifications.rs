use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{DbNotification, Notification, RacType};

pub const CAPACITY_NOTIFICATION: &str = "capacity";

#[instrument(skip(pool))]
pub async fn create_notification(
    pool: &Pool<Sqlite>,
    kind: &str,
    rac_type: Option<RacType>,
    message: &str,
) -> Result<i64, AppError> {
    info!("Creating notification");
    let res = sqlx::query(
        "INSERT INTO notifications (kind, rac_type, message, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(kind)
    .bind(rac_type.map(|r| r.as_str()))
    .bind(message)
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn has_unread_notification(
    pool: &Pool<Sqlite>,
    kind: &str,
    rac_type: RacType,
) -> Result<bool, AppError> {
    let existing: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM notifications WHERE kind = ? AND rac_type = ? AND is_read = FALSE LIMIT 1",
    )
    .bind(kind)
    .bind(rac_type.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(existing.is_some())
}

#[instrument(skip(pool))]
pub async fn list_notifications(
    pool: &Pool<Sqlite>,
    unread_only: bool,
) -> Result<Vec<Notification>, AppError> {
    let query = if unread_only {
        "SELECT id, kind, rac_type, message, created_at, is_read FROM notifications
         WHERE is_read = FALSE ORDER BY created_at DESC, id DESC"
    } else {
        "SELECT id, kind, rac_type, message, created_at, is_read FROM notifications
         ORDER BY created_at DESC, id DESC"
    };

    let rows = sqlx::query_as::<_, DbNotification>(query)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(Notification::from).collect())
}

#[instrument(skip(pool))]
pub async fn mark_notification_read(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    let res = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Notification with id {} not found",
            id
        )));
    }

    Ok(())
}
