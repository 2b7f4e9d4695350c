use chrono::NaiveDate;
use rocket::State;
use rocket::http::Status;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{Permission, User};
use crate::db::{
    create_training_session, delete_training_session, get_training_session, list_bookings,
    list_training_sessions, update_training_session, BookingFilter, TrainingSessionInput,
};
use crate::models::{parse_rac, Booking, TrainingSession};
use crate::validation::{ApiError, AppErrorExt, JsonValidateExt, PermissionCheckExt};

use super::{today, CreatedResponse};

#[derive(Serialize, Deserialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: TrainingSession,
    pub seats_left: i64,
}

impl From<TrainingSession> for SessionResponse {
    fn from(session: TrainingSession) -> Self {
        Self {
            seats_left: session.seats_left(),
            session,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct SessionDetailResponse {
    pub session: SessionResponse,
    pub bookings: Vec<Booking>,
}

#[derive(FromForm)]
pub struct SessionsQueryParams {
    rac_type: Option<String>,
    upcoming: Option<bool>,
}

#[get("/sessions?<params..>")]
pub async fn api_get_sessions(
    params: SessionsQueryParams,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<SessionResponse>>, Status> {
    user.require_permission(Permission::ViewSessions)?;

    let rac_type = params.rac_type.as_deref().map(parse_rac).transpose()?;
    let from = params.upcoming.unwrap_or(false).then(today);

    let sessions = list_training_sessions(db, rac_type, from).await?;

    Ok(Json(sessions.into_iter().map(SessionResponse::from).collect()))
}

/// Bookings are limited to the caller's company; seat counts are not.
#[get("/sessions/<id>")]
pub async fn api_get_session(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<SessionDetailResponse>, Status> {
    user.require_permission(Permission::ViewSessions)?;

    let session = get_training_session(db, id).await?;

    let bookings = if user.has_permission(Permission::ViewBookings) {
        list_bookings(
            db,
            &BookingFilter {
                session_id: Some(id),
                company: user.company_scope().map(String::from),
                ..BookingFilter::default()
            },
        )
        .await?
    } else {
        Vec::new()
    };

    Ok(Json(SessionDetailResponse {
        session: SessionResponse::from(session),
        bookings,
    }))
}

#[derive(Deserialize, Validate)]
pub struct SessionRequest {
    rac_type: String,
    session_date: NaiveDate,
    #[validate(range(min = 1, max = 500, message = "Capacity must be between 1 and 500"))]
    capacity: i64,
    #[validate(length(min = 1, max = 200, message = "Location is required"))]
    location: String,
    #[serde(default)]
    #[validate(length(max = 100, message = "Instructor must be at most 100 characters"))]
    instructor: String,
}

impl SessionRequest {
    fn into_input(self) -> Result<TrainingSessionInput, ApiError> {
        Ok(TrainingSessionInput {
            rac_type: parse_rac(&self.rac_type).validate_custom()?,
            session_date: self.session_date,
            capacity: self.capacity,
            location: self.location.trim().to_string(),
            instructor: self.instructor.trim().to_string(),
        })
    }
}

#[post("/sessions", data = "<session>")]
pub async fn api_create_session(
    session: Json<SessionRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<CreatedResponse>, ApiError> {
    user.require_permission(Permission::ManageSessions)
        .validate_custom()?;
    let input = session.validate_custom()?.into_input()?;

    let id = create_training_session(db, &input)
        .await
        .validate_custom()?;

    Ok(Json(CreatedResponse { id }))
}

#[put("/sessions/<id>", data = "<session>")]
pub async fn api_update_session(
    id: i64,
    session: Json<SessionRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, ApiError> {
    user.require_permission(Permission::ManageSessions)
        .validate_custom()?;
    let input = session.validate_custom()?.into_input()?;

    update_training_session(db, id, &input)
        .await
        .validate_custom()?;

    Ok(Status::Ok)
}

#[delete("/sessions/<id>")]
pub async fn api_delete_session(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, ApiError> {
    user.require_permission(Permission::ManageSessions)
        .validate_custom()?;

    delete_training_session(db, id).await.validate_custom()?;

    Ok(Status::Ok)
}
