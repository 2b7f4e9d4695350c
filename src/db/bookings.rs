use chrono::{NaiveDate, Utc};
use sqlx::{Pool, QueryBuilder, Sqlite};
use std::collections::HashSet;
use tracing::{info, instrument, warn};

use crate::compliance::{certificate_expiry, grade};
use crate::error::AppError;
use crate::models::{Booking, BookingStatus, Certificate, DbBooking, DbCertificate, RacType};

use super::{get_employee, get_training_session, unique_conflict};

const OCCUPIED_SEATS: &str = "(SELECT COUNT(*) FROM bookings
      WHERE session_id = ? AND status IN ('booked', 'passed', 'failed'))";

const SESSION_CAPACITY: &str = "(SELECT capacity FROM training_sessions WHERE id = ?)";

const BOOKING_SELECT: &str = "SELECT b.id, b.session_id, b.employee_id,
        e.name AS employee_name, e.record_id, e.company,
        s.rac_type, s.session_date,
        b.status, b.theory_score, b.practical_score, b.result_date, b.expiry_date,
        b.auto_booked, b.created_at
     FROM bookings b
     JOIN employees e ON e.id = b.employee_id
     JOIN training_sessions s ON s.id = b.session_id";

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub session_id: Option<i64>,
    pub employee_id: Option<i64>,
    pub company: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResultInput {
    pub theory_score: i64,
    pub practical_score: Option<i64>,
    pub result_date: Option<NaiveDate>,
}

fn into_bookings(rows: Vec<DbBooking>) -> Result<Vec<Booking>, AppError> {
    rows.into_iter().map(Booking::try_from).collect()
}

#[instrument(skip(pool))]
pub async fn list_bookings(
    pool: &Pool<Sqlite>,
    filter: &BookingFilter,
) -> Result<Vec<Booking>, AppError> {
    info!("Listing bookings");
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(BOOKING_SELECT);
    query.push(" WHERE 1 = 1");

    if let Some(status) = filter.status {
        query.push(" AND b.status = ").push_bind(status.as_str());
    }

    if let Some(session_id) = filter.session_id {
        query.push(" AND b.session_id = ").push_bind(session_id);
    }

    if let Some(employee_id) = filter.employee_id {
        query.push(" AND b.employee_id = ").push_bind(employee_id);
    }

    if let Some(company) = &filter.company {
        query.push(" AND e.company = ").push_bind(company.clone());
    }

    query.push(" ORDER BY s.session_date DESC, e.name, b.id");

    let rows = query.build_query_as::<DbBooking>().fetch_all(pool).await?;

    into_bookings(rows)
}

#[instrument(skip(pool))]
pub async fn get_booking(pool: &Pool<Sqlite>, id: i64) -> Result<Booking, AppError> {
    let row = sqlx::query_as::<_, DbBooking>(&format!("{} WHERE b.id = ?", BOOKING_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(booking) => Booking::try_from(booking),
        _ => Err(AppError::NotFound(format!("Booking with id {} not found", id))),
    }
}

async fn has_active_booking(
    pool: &Pool<Sqlite>,
    session_id: i64,
    employee_id: i64,
) -> Result<bool, AppError> {
    let existing: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM bookings
         WHERE session_id = ? AND employee_id = ? AND status != 'cancelled'",
    )
    .bind(session_id)
    .bind(employee_id)
    .fetch_optional(pool)
    .await?;

    Ok(existing.is_some())
}

fn already_booked(record_id: &str) -> String {
    format!("Employee {} is already booked into this session", record_id)
}

async fn insert_booking(
    pool: &Pool<Sqlite>,
    session_id: i64,
    employee_id: i64,
    status: BookingStatus,
    auto_booked: bool,
) -> Result<i64, AppError> {
    let res = sqlx::query(
        "INSERT INTO bookings (session_id, employee_id, status, auto_booked, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(session_id)
    .bind(employee_id)
    .bind(status.as_str())
    .bind(auto_booked)
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await
    .map_err(|e| {
        unique_conflict(e, || {
            format!("Employee {} is already in session {}", employee_id, session_id)
        })
    })?;

    Ok(res.last_insert_rowid())
}

/// Inserts a `booked` row only while the session still has a free seat.
/// The seat count and the insert run as one statement, so concurrent
/// bookings cannot overfill a session. Returns `None` when it is full.
async fn insert_booking_if_seat_free(
    pool: &Pool<Sqlite>,
    session_id: i64,
    employee_id: i64,
    record_id: &str,
) -> Result<Option<i64>, AppError> {
    let res = sqlx::query(&format!(
        "INSERT INTO bookings (session_id, employee_id, status, auto_booked, created_at)
         SELECT ?, ?, 'booked', FALSE, ?
         WHERE {} < {}",
        OCCUPIED_SEATS, SESSION_CAPACITY
    ))
    .bind(session_id)
    .bind(employee_id)
    .bind(Utc::now().naive_utc())
    .bind(session_id)
    .bind(session_id)
    .execute(pool)
    .await
    .map_err(|e| unique_conflict(e, || already_booked(record_id)))?;

    if res.rows_affected() == 0 {
        return Ok(None);
    }

    Ok(Some(res.last_insert_rowid()))
}

/// Books an employee into a session, taking a seat immediately.
#[instrument(skip(pool))]
pub async fn book_employee(
    pool: &Pool<Sqlite>,
    session_id: i64,
    employee_id: i64,
    today: NaiveDate,
) -> Result<i64, AppError> {
    info!("Booking employee into training session");
    let session = get_training_session(pool, session_id).await?;
    let employee = get_employee(pool, employee_id).await?;

    if session.session_date < today {
        return Err(AppError::Validation(
            "Cannot book a session in the past".to_string(),
        ));
    }

    if !employee.active {
        return Err(AppError::Validation(format!(
            "Employee {} is inactive",
            employee.record_id
        )));
    }

    if has_active_booking(pool, session_id, employee_id).await? {
        return Err(AppError::Conflict(already_booked(&employee.record_id)));
    }

    match insert_booking_if_seat_free(pool, session_id, employee_id, &employee.record_id).await? {
        Some(id) => Ok(id),
        None => Err(AppError::Validation("Session is full".to_string())),
    }
}

/// Stores a pending proposal produced by the auto-booking planner. Returns
/// `None` when the pair is already booked.
#[instrument(skip(pool))]
pub async fn create_pending_booking(
    pool: &Pool<Sqlite>,
    session_id: i64,
    employee_id: i64,
) -> Result<Option<i64>, AppError> {
    if has_active_booking(pool, session_id, employee_id).await? {
        warn!("Skipping proposal for an employee already in the session");
        return Ok(None);
    }

    insert_booking(pool, session_id, employee_id, BookingStatus::Pending, true)
        .await
        .map(Some)
}

async fn set_status(pool: &Pool<Sqlite>, id: i64, status: BookingStatus) -> Result<(), AppError> {
    sqlx::query("UPDATE bookings SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn record_booking_results(
    pool: &Pool<Sqlite>,
    id: i64,
    input: &ResultInput,
    pass_mark: i64,
    validity_months: u32,
) -> Result<Booking, AppError> {
    info!("Recording booking results");
    let booking = get_booking(pool, id).await?;

    if !booking.status.occupies_seat() {
        return Err(AppError::Validation(format!(
            "Results cannot be recorded for a {} booking",
            booking.status
        )));
    }

    let passed = grade(
        booking.rac_type,
        input.theory_score,
        input.practical_score,
        pass_mark,
    )?;
    let result_date = input.result_date.unwrap_or(booking.session_date);
    let (status, expiry_date) = if passed {
        (
            BookingStatus::Passed,
            Some(certificate_expiry(result_date, validity_months)?),
        )
    } else {
        (BookingStatus::Failed, None)
    };

    sqlx::query(
        "UPDATE bookings
         SET status = ?, theory_score = ?, practical_score = ?, result_date = ?, expiry_date = ?
         WHERE id = ?",
    )
    .bind(status.as_str())
    .bind(input.theory_score)
    .bind(input.practical_score)
    .bind(result_date)
    .bind(expiry_date)
    .bind(id)
    .execute(pool)
    .await?;

    get_booking(pool, id).await
}

#[instrument(skip(pool))]
pub async fn cancel_booking(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Cancelling booking");
    let booking = get_booking(pool, id).await?;

    match booking.status {
        BookingStatus::Pending | BookingStatus::Booked => {
            set_status(pool, id, BookingStatus::Cancelled).await
        }
        status => Err(AppError::Validation(format!(
            "A {} booking cannot be cancelled",
            status
        ))),
    }
}

/// Turns a pending proposal into a real booking if the session has room.
#[instrument(skip(pool))]
pub async fn approve_booking(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Approving booking");
    let booking = get_booking(pool, id).await?;

    if booking.status != BookingStatus::Pending {
        return Err(AppError::Validation(format!(
            "Only pending bookings can be approved, this one is {}",
            booking.status
        )));
    }

    // Seat check and status change in one statement; see `insert_booking_if_seat_free`.
    let res = sqlx::query(&format!(
        "UPDATE bookings SET status = 'booked'
         WHERE id = ? AND status = 'pending' AND {} < {}",
        OCCUPIED_SEATS, SESSION_CAPACITY
    ))
    .bind(id)
    .bind(booking.session_id)
    .bind(booking.session_id)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        let current = get_booking(pool, id).await?;
        if current.status != BookingStatus::Pending {
            return Err(AppError::Validation(format!(
                "Only pending bookings can be approved, this one is {}",
                current.status
            )));
        }
        return Err(AppError::Validation("Session is full".to_string()));
    }

    Ok(())
}

#[instrument(skip(pool))]
pub async fn reject_booking(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Rejecting booking");
    let booking = get_booking(pool, id).await?;

    if booking.status != BookingStatus::Pending {
        return Err(AppError::Validation(format!(
            "Only pending bookings can be rejected, this one is {}",
            booking.status
        )));
    }

    set_status(pool, id, BookingStatus::Cancelled).await
}

/// The latest passed expiry per (employee, RAC).
#[instrument(skip(pool))]
pub async fn list_certificates(pool: &Pool<Sqlite>) -> Result<Vec<Certificate>, AppError> {
    let rows = sqlx::query_as::<_, DbCertificate>(
        "SELECT b.employee_id, s.rac_type, MAX(b.expiry_date) AS expiry_date
         FROM bookings b
         JOIN training_sessions s ON s.id = b.session_id
         WHERE b.status = 'passed' AND b.expiry_date IS NOT NULL
         GROUP BY b.employee_id, s.rac_type",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Certificate::try_from).collect()
}

/// (employee, RAC) pairs already pending or booked into a session on or
/// after `today`.
#[instrument(skip(pool))]
pub async fn upcoming_booked_pairs(
    pool: &Pool<Sqlite>,
    today: NaiveDate,
) -> Result<HashSet<(i64, RacType)>, AppError> {
    let rows: Vec<(i64, String)> = sqlx::query_as(
        "SELECT DISTINCT b.employee_id, s.rac_type
         FROM bookings b
         JOIN training_sessions s ON s.id = b.session_id
         WHERE b.status IN ('pending', 'booked') AND s.session_date >= ?",
    )
    .bind(today)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(employee_id, rac)| {
            RacType::from_str(&rac)
                .map(|rac| (employee_id, rac))
                .map_err(|e| AppError::Internal(e.to_string()))
        })
        .collect()
}

/// (employee, session) pairs holding a non-cancelled booking in a session on
/// or after `today`. The planner must not propose these again.
#[instrument(skip(pool))]
pub async fn upcoming_session_pairs(
    pool: &Pool<Sqlite>,
    today: NaiveDate,
) -> Result<HashSet<(i64, i64)>, AppError> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT b.employee_id, b.session_id
         FROM bookings b
         JOIN training_sessions s ON s.id = b.session_id
         WHERE b.status != 'cancelled' AND s.session_date >= ?",
    )
    .bind(today)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}
