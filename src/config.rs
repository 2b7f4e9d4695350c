use chrono::Duration;
use rocket::figment::Figment;
use serde::Deserialize;

use crate::error::AppError;

/// Application settings, read from the same figment Rocket uses so they can
/// live in `Rocket.toml` or be overridden with `ROCKET_*` variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub session_idle_minutes: i64,
    pub session_lifetime_hours: i64,
    pub certificate_validity_months: u32,
    pub expiry_warning_days: i64,
    pub pass_mark: i64,
    pub demand_alert_ratio: f64,
    pub background_interval_secs: u64,
    pub admin_username: String,
    pub admin_company: String,
    pub admin_password: Option<String>,
    pub seed_demo_data: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            session_idle_minutes: 30,
            session_lifetime_hours: 8,
            certificate_validity_months: 24,
            expiry_warning_days: 30,
            pass_mark: 70,
            demand_alert_ratio: 1.0,
            background_interval_secs: 3600,
            admin_username: "admin".to_string(),
            admin_company: "Vale".to_string(),
            admin_password: None,
            seed_demo_data: false,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, AppError> {
        Self::from_figment(&rocket::Config::figment())
    }

    pub fn from_figment(figment: &Figment) -> Result<Self, AppError> {
        let settings: Settings = figment.extract()?;

        if settings.session_idle_minutes <= 0 || settings.session_lifetime_hours <= 0 {
            return Err(AppError::Validation(
                "Session timeouts must be positive".to_string(),
            ));
        }

        if !(0..=100).contains(&settings.pass_mark) {
            return Err(AppError::Validation(
                "Pass mark must be between 0 and 100".to_string(),
            ));
        }

        if settings.demand_alert_ratio <= 0.0 {
            return Err(AppError::Validation(
                "Demand alert ratio must be positive".to_string(),
            ));
        }

        Ok(settings)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::minutes(self.session_idle_minutes)
    }

    pub fn session_lifetime(&self) -> Duration {
        Duration::hours(self.session_lifetime_hours)
    }
}
