use chrono::NaiveDate;
use rocket::State;
use rocket::http::Status;
use rocket::serde::json::Json;
use serde::Deserialize;
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{Permission, User};
use crate::config::Settings;
use crate::db::{
    approve_booking, book_employee, cancel_booking, get_booking, get_employee, list_bookings,
    record_booking_results, reject_booking, BookingFilter, ResultInput,
};
use crate::error::AppError;
use crate::models::{Booking, BookingStatus};
use crate::planning::{approve_bookings, propose_auto_bookings, ApprovalOutcome};
use crate::validation::{ApiError, AppErrorExt, JsonValidateExt, PermissionCheckExt};

use super::{today, CreatedResponse};

/// Loads a booking and checks the caller may see the employee's company.
async fn scoped_booking(db: &Pool<Sqlite>, user: &User, id: i64) -> Result<Booking, AppError> {
    let booking = get_booking(db, id).await?;

    if !user.can_access_company(&booking.company) {
        return Err(AppError::Authorization(format!(
            "Booking {} belongs to another company",
            id
        )));
    }

    Ok(booking)
}

#[derive(FromForm)]
pub struct BookingsQueryParams {
    status: Option<String>,
    session_id: Option<i64>,
    employee_id: Option<i64>,
}

#[get("/bookings?<params..>")]
pub async fn api_get_bookings(
    params: BookingsQueryParams,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<Booking>>, Status> {
    user.require_permission(Permission::ViewBookings)?;

    let status = params
        .status
        .as_deref()
        .map(BookingStatus::from_str)
        .transpose()
        .map_err(|_| Status::BadRequest)?;

    let bookings = list_bookings(
        db,
        &BookingFilter {
            status,
            session_id: params.session_id,
            employee_id: params.employee_id,
            company: user.company_scope().map(String::from),
        },
    )
    .await?;

    Ok(Json(bookings))
}

#[derive(Deserialize, Validate)]
pub struct BookingRequest {
    session_id: i64,
    employee_id: i64,
}

#[post("/bookings", data = "<booking>")]
pub async fn api_create_booking(
    booking: Json<BookingRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<CreatedResponse>, ApiError> {
    user.require_permission(Permission::ManageBookings)
        .validate_custom()?;
    let request = booking.validate_custom()?;

    let employee = get_employee(db, request.employee_id)
        .await
        .validate_custom()?;
    user.require_company(&employee.company).validate_custom()?;

    let id = book_employee(db, request.session_id, request.employee_id, today())
        .await
        .validate_custom()?;

    Ok(Json(CreatedResponse { id }))
}

#[derive(Deserialize, Validate)]
pub struct ResultRequest {
    #[validate(range(min = 0, max = 100, message = "Scores must be between 0 and 100"))]
    theory_score: i64,
    #[validate(range(min = 0, max = 100, message = "Scores must be between 0 and 100"))]
    practical_score: Option<i64>,
    result_date: Option<NaiveDate>,
}

#[put("/bookings/<id>/results", data = "<result>")]
pub async fn api_record_results(
    id: i64,
    result: Json<ResultRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
    settings: &State<Settings>,
) -> Result<Json<Booking>, ApiError> {
    user.require_permission(Permission::RecordResults)
        .validate_custom()?;
    let result = result.validate_custom()?;

    scoped_booking(db, &user, id).await.validate_custom()?;

    let booking = record_booking_results(
        db,
        id,
        &ResultInput {
            theory_score: result.theory_score,
            practical_score: result.practical_score,
            result_date: result.result_date,
        },
        settings.pass_mark,
        settings.certificate_validity_months,
    )
    .await
    .validate_custom()?;

    Ok(Json(booking))
}

#[post("/bookings/<id>/cancel")]
pub async fn api_cancel_booking(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, ApiError> {
    user.require_permission(Permission::ManageBookings)
        .validate_custom()?;

    scoped_booking(db, &user, id).await.validate_custom()?;
    cancel_booking(db, id).await.validate_custom()?;

    Ok(Status::Ok)
}

#[post("/bookings/<id>/approve")]
pub async fn api_approve_booking(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, ApiError> {
    user.require_permission(Permission::ApproveBookings)
        .validate_custom()?;

    scoped_booking(db, &user, id).await.validate_custom()?;
    approve_booking(db, id).await.validate_custom()?;

    Ok(Status::Ok)
}

#[post("/bookings/<id>/reject")]
pub async fn api_reject_booking(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, ApiError> {
    user.require_permission(Permission::ApproveBookings)
        .validate_custom()?;

    scoped_booking(db, &user, id).await.validate_custom()?;
    reject_booking(db, id).await.validate_custom()?;

    Ok(Status::Ok)
}

#[post("/bookings/auto")]
pub async fn api_auto_book(
    user: User,
    db: &State<Pool<Sqlite>>,
    settings: &State<Settings>,
) -> Result<Json<Vec<Booking>>, ApiError> {
    user.require_permission(Permission::ManageBookings)
        .validate_custom()?;

    let proposals = propose_auto_bookings(db, settings, today(), user.company_scope())
        .await
        .validate_custom()?;

    Ok(Json(proposals))
}

#[derive(Deserialize, Validate)]
pub struct ApproveManyRequest {
    #[validate(length(min = 1, message = "Select at least one booking"))]
    ids: Vec<i64>,
}

#[post("/bookings/approve", data = "<request>")]
pub async fn api_approve_bookings(
    request: Json<ApproveManyRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<ApprovalOutcome>, ApiError> {
    user.require_permission(Permission::ApproveBookings)
        .validate_custom()?;
    let request = request.validate_custom()?;

    let outcome = approve_bookings(db, &request.ids, user.company_scope()).await;

    Ok(Json(outcome))
}
