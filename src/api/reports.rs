use rocket::State;
use rocket::http::Status;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};

use crate::auth::{Permission, User};
use crate::compliance::{
    expiring_certificates, summarize, CompanySummary, ExpiringCertificate, RacDemand,
};
use crate::config::Settings;
use crate::db::{list_notifications, mark_notification_read};
use crate::models::Notification;
use crate::planning::{compliance_snapshot, demand_report, refresh_capacity_notifications};
use crate::validation::{ApiError, AppErrorExt, PermissionCheckExt};

use super::today;

#[get("/reports/compliance")]
pub async fn api_compliance_report(
    user: User,
    db: &State<Pool<Sqlite>>,
    settings: &State<Settings>,
) -> Result<Json<Vec<CompanySummary>>, Status> {
    user.require_permission(Permission::ViewReports)?;

    let compliances = compliance_snapshot(db, settings, today(), user.company_scope()).await?;

    Ok(Json(summarize(&compliances)))
}

#[get("/reports/expiring?<days>")]
pub async fn api_expiring_report(
    days: Option<i64>,
    user: User,
    db: &State<Pool<Sqlite>>,
    settings: &State<Settings>,
) -> Result<Json<Vec<ExpiringCertificate>>, Status> {
    user.require_permission(Permission::ViewReports)?;

    let days = days.unwrap_or(settings.expiry_warning_days);
    if !(0..=3650).contains(&days) {
        return Err(Status::BadRequest);
    }

    let today = today();
    let compliances = compliance_snapshot(db, settings, today, user.company_scope()).await?;

    Ok(Json(expiring_certificates(&compliances, today, days)))
}

#[get("/reports/demand")]
pub async fn api_demand_report(
    user: User,
    db: &State<Pool<Sqlite>>,
    settings: &State<Settings>,
) -> Result<Json<Vec<RacDemand>>, Status> {
    user.require_permission(Permission::ViewReports)?;

    let report = demand_report(db, settings, today(), user.company_scope()).await?;

    Ok(Json(report))
}

#[get("/notifications?<unread_only>")]
pub async fn api_get_notifications(
    unread_only: Option<bool>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<Notification>>, Status> {
    user.require_permission(Permission::ViewReports)?;

    let notifications = list_notifications(db, unread_only.unwrap_or(false)).await?;

    Ok(Json(notifications))
}

#[post("/notifications/<id>/read")]
pub async fn api_mark_notification_read(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, ApiError> {
    user.require_permission(Permission::ManageNotifications)
        .validate_custom()?;

    mark_notification_read(db, id).await.validate_custom()?;

    Ok(Status::Ok)
}

#[derive(Serialize, Deserialize)]
pub struct RefreshResponse {
    pub created: Vec<i64>,
}

#[post("/notifications/refresh")]
pub async fn api_refresh_notifications(
    user: User,
    db: &State<Pool<Sqlite>>,
    settings: &State<Settings>,
) -> Result<Json<RefreshResponse>, ApiError> {
    user.require_permission(Permission::ManageNotifications)
        .validate_custom()?;

    let created = refresh_capacity_notifications(db, settings, today())
        .await
        .validate_custom()?;

    Ok(Json(RefreshResponse { created }))
}
