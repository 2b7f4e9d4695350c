use chrono::{NaiveDate, Utc};

pub mod auth;
pub mod bookings;
pub mod employees;
pub mod reports;
pub mod sessions;
pub mod users;

pub use auth::*;
pub use bookings::*;
pub use employees::*;
pub use reports::*;
pub use sessions::*;
pub use users::*;

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}
