pub mod bookings;
pub mod employees;
pub mod notifications;
pub mod training_sessions;
pub mod user_sessions;
pub mod users;

pub use bookings::*;
pub use employees::*;
pub use notifications::*;
pub use training_sessions::*;
pub use user_sessions::*;
pub use users::*;

use crate::error::AppError;

/// Maps a UNIQUE constraint failure to `Conflict`; other errors pass through.
pub(crate) fn unique_conflict(err: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    let is_unique =
        matches!(&err, sqlx::Error::Database(db_err) if db_err.is_unique_violation());

    if is_unique {
        AppError::Conflict(message())
    } else {
        AppError::Database(err)
    }
}
