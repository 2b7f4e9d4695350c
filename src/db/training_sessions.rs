use chrono::NaiveDate;
use sqlx::{Pool, QueryBuilder, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{DbTrainingSession, RacType, TrainingSession};

const SESSION_SELECT: &str = "SELECT s.id, s.rac_type, s.session_date, s.capacity, s.location, s.instructor,
        (SELECT COUNT(*) FROM bookings b
          WHERE b.session_id = s.id AND b.status IN ('booked', 'passed', 'failed')) AS booked_count,
        (SELECT COUNT(*) FROM bookings b
          WHERE b.session_id = s.id AND b.status = 'pending') AS pending_count
     FROM training_sessions s";

#[derive(Debug, Clone)]
pub struct TrainingSessionInput {
    pub rac_type: RacType,
    pub session_date: NaiveDate,
    pub capacity: i64,
    pub location: String,
    pub instructor: String,
}

fn into_sessions(rows: Vec<DbTrainingSession>) -> Result<Vec<TrainingSession>, AppError> {
    rows.into_iter().map(TrainingSession::try_from).collect()
}

/// Sessions ordered by date, optionally limited to one RAC type and to
/// sessions on or after `from`.
#[instrument(skip(pool))]
pub async fn list_training_sessions(
    pool: &Pool<Sqlite>,
    rac_type: Option<RacType>,
    from: Option<NaiveDate>,
) -> Result<Vec<TrainingSession>, AppError> {
    info!("Listing training sessions");
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(SESSION_SELECT);
    query.push(" WHERE 1 = 1");

    if let Some(rac_type) = rac_type {
        query.push(" AND s.rac_type = ").push_bind(rac_type.as_str());
    }

    if let Some(from) = from {
        query.push(" AND s.session_date >= ").push_bind(from);
    }

    query.push(" ORDER BY s.session_date, s.id");

    let rows = query
        .build_query_as::<DbTrainingSession>()
        .fetch_all(pool)
        .await?;

    into_sessions(rows)
}

#[instrument(skip(pool))]
pub async fn get_training_session(
    pool: &Pool<Sqlite>,
    id: i64,
) -> Result<TrainingSession, AppError> {
    let row = sqlx::query_as::<_, DbTrainingSession>(&format!("{} WHERE s.id = ?", SESSION_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(session) => TrainingSession::try_from(session),
        _ => Err(AppError::NotFound(format!(
            "Training session with id {} not found",
            id
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn create_training_session(
    pool: &Pool<Sqlite>,
    input: &TrainingSessionInput,
) -> Result<i64, AppError> {
    info!("Creating training session");
    let res = sqlx::query(
        "INSERT INTO training_sessions (rac_type, session_date, capacity, location, instructor)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(input.rac_type.as_str())
    .bind(input.session_date)
    .bind(input.capacity)
    .bind(&input.location)
    .bind(&input.instructor)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn update_training_session(
    pool: &Pool<Sqlite>,
    id: i64,
    input: &TrainingSessionInput,
) -> Result<(), AppError> {
    info!("Updating training session");
    let existing = get_training_session(pool, id).await?;

    if input.capacity < existing.booked_count {
        return Err(AppError::Validation(format!(
            "Capacity cannot be lower than the {} seats already taken",
            existing.booked_count
        )));
    }

    if input.rac_type != existing.rac_type && existing.booked_count + existing.pending_count > 0 {
        return Err(AppError::Validation(
            "RAC type cannot change once employees are booked".to_string(),
        ));
    }

    sqlx::query(
        "UPDATE training_sessions
         SET rac_type = ?, session_date = ?, capacity = ?, location = ?, instructor = ?
         WHERE id = ?",
    )
    .bind(input.rac_type.as_str())
    .bind(input.session_date)
    .bind(input.capacity)
    .bind(&input.location)
    .bind(&input.instructor)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Sessions with recorded results are kept as the certificate history.
#[instrument(skip(pool))]
pub async fn delete_training_session(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting training session");
    get_training_session(pool, id).await?;

    let (results,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM bookings WHERE session_id = ? AND status IN ('passed', 'failed')",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    if results > 0 {
        return Err(AppError::Validation(
            "Training session has recorded results and cannot be deleted".to_string(),
        ));
    }

    sqlx::query("DELETE FROM training_sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}
