use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use super::unique_conflict;
use crate::{
    auth::{DbUser, Role, User},
    error::AppError,
};

const USER_COLUMNS: &str = "id, username, display_name, role, company, archived";

// bcrypt at full cost dominates test run time.
const HASH_COST: u32 = if cfg!(test) { 4 } else { bcrypt::DEFAULT_COST };

fn username_taken(username: &str) -> String {
    format!("Username '{}' already exists", username)
}

#[instrument(skip(pool))]
pub async fn get_user(pool: &Pool<Sqlite>, id: i64) -> Result<User, AppError> {
    info!("Fetching user by ID");
    let row = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {} FROM users WHERE id = ?",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(user) => Ok(User::from(user)),
        _ => Err(AppError::NotFound(format!(
            "User with id {} not found in database",
            id
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn find_user_by_username(
    pool: &Pool<Sqlite>,
    username: &str,
) -> Result<Option<User>, AppError> {
    info!("Finding user by username");
    let row = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {} FROM users WHERE username = ?",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(User::from))
}

/// Returns the user when the password matches and the account is not archived.
#[instrument(skip_all, fields(username))]
pub async fn authenticate_user(
    pool: &Pool<Sqlite>,
    username: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    info!("Authenticating user");
    let hash: Option<(i64, String)> =
        sqlx::query_as("SELECT id, password FROM users WHERE username = ? AND archived = FALSE")
            .bind(username)
            .fetch_optional(pool)
            .await?;

    let Some((id, hash)) = hash else {
        return Ok(None);
    };

    match bcrypt::verify(password, &hash) {
        Ok(true) => Ok(Some(get_user(pool, id).await?)),
        _ => Ok(None),
    }
}

#[instrument(skip(pool, password))]
pub async fn create_user(
    pool: &Pool<Sqlite>,
    username: &str,
    password: &str,
    role: Role,
    display_name: &str,
    company: &str,
) -> Result<i64, AppError> {
    info!("Creating new user");

    if find_user_by_username(pool, username).await?.is_some() {
        return Err(AppError::Conflict(username_taken(username)));
    }

    let hashed_password = bcrypt::hash(password, HASH_COST)?;

    let res = sqlx::query(
        "INSERT INTO users (username, password, role, display_name, company) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(username)
    .bind(hashed_password)
    .bind(role.as_str())
    .bind(display_name)
    .bind(company)
    .execute(pool)
    .await
    .map_err(|e| unique_conflict(e, || username_taken(username)))?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn get_all_users(pool: &Pool<Sqlite>) -> Result<Vec<User>, AppError> {
    info!("Getting all users");
    let rows = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {} FROM users ORDER BY username",
        USER_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(User::from).collect())
}

#[instrument(skip(pool))]
pub async fn count_users(pool: &Pool<Sqlite>) -> Result<i64, AppError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

async fn ensure_user_exists(pool: &Pool<Sqlite>, user_id: i64) -> Result<(), AppError> {
    get_user(pool, user_id).await.map(|_| ())
}

#[instrument(skip(pool))]
pub async fn update_user_display_name(
    pool: &Pool<Sqlite>,
    user_id: i64,
    display_name: &str,
) -> Result<(), AppError> {
    info!("Updating user display name");
    ensure_user_exists(pool, user_id).await?;
    sqlx::query("UPDATE users SET display_name = ? WHERE id = ?")
        .bind(display_name)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip_all, fields(user_id))]
pub async fn update_user_password(
    pool: &Pool<Sqlite>,
    user_id: i64,
    new_password: &str,
) -> Result<(), AppError> {
    info!("Updating user password");
    ensure_user_exists(pool, user_id).await?;
    let hashed_password = bcrypt::hash(new_password, HASH_COST)?;

    sqlx::query("UPDATE users SET password = ? WHERE id = ?")
        .bind(hashed_password)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn update_user_role(pool: &Pool<Sqlite>, user_id: i64, role: Role) -> Result<(), AppError> {
    info!("Updating user role");
    ensure_user_exists(pool, user_id).await?;
    sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(role.as_str())
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn update_user_company(
    pool: &Pool<Sqlite>,
    user_id: i64,
    company: &str,
) -> Result<(), AppError> {
    info!("Updating user company");
    ensure_user_exists(pool, user_id).await?;
    sqlx::query("UPDATE users SET company = ? WHERE id = ?")
        .bind(company)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Archiving also ends every open session of the user.
#[instrument(skip(pool))]
pub async fn set_user_archived(
    pool: &Pool<Sqlite>,
    user_id: i64,
    archive: bool,
) -> Result<bool, AppError> {
    info!("Toggling user archived status");
    ensure_user_exists(pool, user_id).await?;

    sqlx::query("UPDATE users SET archived = ? WHERE id = ?")
        .bind(archive)
        .bind(user_id)
        .execute(pool)
        .await?;

    if archive {
        sqlx::query("DELETE FROM user_sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(pool)
            .await?;
    }

    Ok(archive)
}
