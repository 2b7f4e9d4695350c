#[macro_use]
extern crate rocket;

mod api;
mod auth;
mod compliance;
mod config;
mod db;
mod env;
mod error;
mod models;
mod planning;
mod seed;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;

use api::{
    api_approve_booking, api_approve_bookings, api_auto_book, api_cancel_booking,
    api_change_password, api_compliance_report, api_create_booking, api_create_employee,
    api_create_session, api_delete_employee, api_delete_session, api_demand_report,
    api_expiring_report, api_get_all_users, api_get_bookings, api_get_compliance_card,
    api_get_employee, api_get_employee_bookings, api_get_employee_compliance, api_get_employees,
    api_get_notifications, api_get_requirements, api_get_session, api_get_sessions, api_login,
    api_logout, api_mark_notification_read, api_me, api_me_unauthorized, api_record_results,
    api_refresh_notifications, api_register_user, api_reject_booking, api_set_requirements,
    api_update_employee, api_update_profile, api_update_session, api_update_user, health,
};
use auth::{forbidden_api, unauthorized_api};
use config::Settings;
use db::clean_expired_sessions;
use error::AppError;
use planning::refresh_capacity_notifications;
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};
use telemetry::{TelemetryFairing, init_tracing, shutdown_telemetry};

use sqlx::SqlitePool;
use tracing::{error, info};

async fn setup() -> Result<(SqlitePool, Settings), AppError> {
    let settings = Settings::load()?;

    let database_url = std::env::var("DATABASE_URL").unwrap_or_default();
    let pool = SqlitePool::connect(&database_url).await?;

    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed successfully");

    seed::bootstrap_admin(&pool, &settings).await?;
    if settings.seed_demo_data {
        seed::seed_demo_data(&pool, &settings, api::today()).await?;
    }

    Ok((pool, settings))
}

fn spawn_background_jobs(pool: SqlitePool, settings: Settings) {
    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;

        loop {
            match clean_expired_sessions(&pool, settings.idle_timeout()).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    }
                }
                Err(e) => {
                    error!("Failed to clean expired sessions: {}", e);
                }
            }

            match refresh_capacity_notifications(&pool, &settings, api::today()).await {
                Ok(created) => {
                    if !created.is_empty() {
                        info!("Raised {} capacity notifications", created.len());
                    }
                }
                Err(e) => {
                    error!("Failed to refresh capacity notifications: {}", e);
                }
            }

            tokio::time::sleep(tokio::time::Duration::from_secs(
                settings.background_interval_secs.max(60),
            ))
            .await;
        }
    });
}

#[launch]
async fn rocket() -> _ {
    let loaded = env::load_environment();
    init_tracing();

    match loaded {
        Ok(files) => info!(files = ?files, "Loaded environment files"),
        Err(e) => error!("Failed to load environment files: {}", e),
    }

    let (pool, settings) = match setup().await {
        Ok(ready) => ready,
        Err(e) => {
            error!("Startup failed: {}", e);
            panic!("Startup failed: {}", e);
        }
    };

    spawn_background_jobs(pool.clone(), settings.clone());

    init_rocket(pool, settings).await
}

pub async fn init_rocket(pool: SqlitePool, settings: Settings) -> Rocket<Build> {
    info!("Starting RAC training tracker");

    rocket::build()
        .manage(pool)
        .manage(settings)
        .mount(
            "/api",
            routes![
                api_login,
                api_logout,
                api_me,
                api_me_unauthorized,
                api_update_profile,
                api_change_password,
                api_get_all_users,
                api_register_user,
                api_update_user,
                api_get_employees,
                api_get_employee,
                api_create_employee,
                api_update_employee,
                api_delete_employee,
                api_get_requirements,
                api_set_requirements,
                api_get_employee_bookings,
                api_get_employee_compliance,
                api_get_compliance_card,
                api_get_sessions,
                api_get_session,
                api_create_session,
                api_update_session,
                api_delete_session,
                api_get_bookings,
                api_create_booking,
                api_record_results,
                api_cancel_booking,
                api_approve_booking,
                api_reject_booking,
                api_auto_book,
                api_approve_bookings,
                api_compliance_report,
                api_expiring_report,
                api_demand_report,
                api_get_notifications,
                api_mark_notification_read,
                api_refresh_notifications,
            ],
        )
        .register("/api", catchers![unauthorized_api, forbidden_api])
        .mount("/api", routes![health])
        .attach(TelemetryFairing)
        .attach(AdHoc::on_shutdown("Telemetry shutdown", |_| {
            Box::pin(async {
                shutdown_telemetry();
            })
        }))
}
