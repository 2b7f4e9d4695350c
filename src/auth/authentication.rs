use chrono::Utc;
use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tracing::Instrument;

use crate::config::Settings;
use crate::db::{get_session_by_token, get_user, invalidate_session, touch_session};

use super::User;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        authenticate(request)
            .instrument(tracing::info_span!("user_auth_guard"))
            .await
    }
}

async fn authenticate(request: &Request<'_>) -> Outcome<User, ()> {
    let token = request
        .cookies()
        .get_private("session_token")
        .map(|c| c.value().to_string());

    let Some(token) = token else {
        return Outcome::Error((Status::Unauthorized, ()));
    };

    let (db, settings) = match (
        request.rocket().state::<SqlitePool>(),
        request.rocket().state::<Settings>(),
    ) {
        (Some(pool), Some(settings)) => (pool, settings),
        _ => {
            tracing::error!("Database pool or settings not found in managed state");
            return Outcome::Error((Status::InternalServerError, ()));
        }
    };

    let session = match get_session_by_token(db, &token).await {
        Ok(session) => session,
        Err(err) => {
            tracing::warn!(error = ?err, "Invalid session token");
            return Outcome::Forward(Status::Unauthorized);
        }
    };

    let now = Utc::now().naive_utc();
    if !session.is_valid(now, settings.idle_timeout()) {
        tracing::info!(user_id = %session.user_id, "Session expired or idle, logging out");
        if let Err(err) = invalidate_session(db, &token).await {
            tracing::error!(error = ?err, "Failed to remove stale session");
        }
        return Outcome::Forward(Status::Unauthorized);
    }

    let user = match get_user(db, session.user_id).await {
        Ok(user) => user,
        Err(err) => {
            tracing::error!(user_id = %session.user_id, error = ?err, "Failed to fetch user for valid session");
            return Outcome::Error((Status::InternalServerError, ()));
        }
    };

    if user.archived {
        tracing::warn!(username = %user.username, "Archived user presented a session");
        return Outcome::Forward(Status::Unauthorized);
    }

    if let Err(err) = touch_session(db, &token, now).await {
        tracing::error!(error = ?err, "Failed to record session activity");
    }

    tracing::debug!(username = %user.username, role = %user.role.as_str(), "User authenticated via session token");
    Outcome::Success(user)
}

#[catch(401)]
pub fn unauthorized_api(_req: &Request) -> Custom<Json<Value>> {
    Custom(
        Status::Unauthorized,
        Json(json!({
            "error": "Unauthorized",
            "message": "Authentication required"
        })),
    )
}

#[catch(403)]
pub fn forbidden_api(_req: &Request) -> Custom<Json<Value>> {
    tracing::warn!("Forbidden access attempt");
    Custom(
        Status::Forbidden,
        Json(json!({
            "error": "Forbidden",
            "message": "You don't have permission to perform this action"
        })),
    )
}
