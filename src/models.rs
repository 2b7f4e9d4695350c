use anyhow::Error;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AppError;

/// The critical-activity certifications tracked for the workforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RacType {
    Rac01,
    Rac02,
    Rac03,
    Rac04,
    Rac05,
    Rac06,
    Rac07,
    Rac08,
    Rac09,
    Rac10,
    Rac11,
}

impl RacType {
    pub const ALL: [RacType; 11] = [
        RacType::Rac01,
        RacType::Rac02,
        RacType::Rac03,
        RacType::Rac04,
        RacType::Rac05,
        RacType::Rac06,
        RacType::Rac07,
        RacType::Rac08,
        RacType::Rac09,
        RacType::Rac10,
        RacType::Rac11,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RacType::Rac01 => "RAC01",
            RacType::Rac02 => "RAC02",
            RacType::Rac03 => "RAC03",
            RacType::Rac04 => "RAC04",
            RacType::Rac05 => "RAC05",
            RacType::Rac06 => "RAC06",
            RacType::Rac07 => "RAC07",
            RacType::Rac08 => "RAC08",
            RacType::Rac09 => "RAC09",
            RacType::Rac10 => "RAC10",
            RacType::Rac11 => "RAC11",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, Error> {
        RacType::ALL
            .iter()
            .copied()
            .find(|rac| rac.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::msg(format!("Unknown RAC type: {}", s)))
    }

    pub fn title(&self) -> &'static str {
        match self {
            RacType::Rac01 => "Working at Height",
            RacType::Rac02 => "Light Vehicles",
            RacType::Rac03 => "Mobile Equipment",
            RacType::Rac04 => "Machine Guarding",
            RacType::Rac05 => "Isolation and Lockout",
            RacType::Rac06 => "Lifting Operations",
            RacType::Rac07 => "Ground Control",
            RacType::Rac08 => "Confined Spaces",
            RacType::Rac09 => "Explosives",
            RacType::Rac10 => "Molten Metal",
            RacType::Rac11 => "Traffic Rules",
        }
    }

    pub fn requires_practical(&self) -> bool {
        matches!(self, RacType::Rac02 | RacType::Rac03 | RacType::Rac06)
    }

    pub fn requires_driver_license(&self) -> bool {
        matches!(self, RacType::Rac02 | RacType::Rac03)
    }
}

impl fmt::Display for RacType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn parse_rac(value: &str) -> Result<RacType, AppError> {
    RacType::from_str(value).map_err(|e| AppError::Validation(e.to_string()))
}

fn stored_rac(value: Option<String>) -> Result<RacType, AppError> {
    let value = value.unwrap_or_default();
    RacType::from_str(&value).map_err(|e| AppError::Internal(e.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Booked,
    Passed,
    Failed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Booked => "booked",
            BookingStatus::Passed => "passed",
            BookingStatus::Failed => "failed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "booked" => Ok(BookingStatus::Booked),
            "passed" => Ok(BookingStatus::Passed),
            "failed" => Ok(BookingStatus::Failed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            _ => Err(Error::msg(format!("Unknown booking status: {}", s))),
        }
    }

    pub fn occupies_seat(&self) -> bool {
        matches!(
            self,
            BookingStatus::Booked | BookingStatus::Passed | BookingStatus::Failed
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Employee {
    pub id: i64,
    pub record_id: String,
    pub name: String,
    pub company: String,
    pub department: String,
    pub job_title: String,
    pub driver_license_number: Option<String>,
    pub driver_license_class: Option<String>,
    pub driver_license_expiry: Option<NaiveDate>,
    pub active: bool,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbEmployee {
    pub id: Option<i64>,
    pub record_id: Option<String>,
    pub name: Option<String>,
    pub company: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub driver_license_number: Option<String>,
    pub driver_license_class: Option<String>,
    pub driver_license_expiry: Option<NaiveDate>,
    pub active: Option<bool>,
}

impl From<DbEmployee> for Employee {
    fn from(db: DbEmployee) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            record_id: db.record_id.unwrap_or_default(),
            name: db.name.unwrap_or_default(),
            company: db.company.unwrap_or_default(),
            department: db.department.unwrap_or_default(),
            job_title: db.job_title.unwrap_or_default(),
            driver_license_number: db.driver_license_number,
            driver_license_class: db.driver_license_class,
            driver_license_expiry: db.driver_license_expiry,
            active: db.active.unwrap_or(true),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct EmployeeRequirement {
    pub employee_id: i64,
    pub required_racs: Vec<RacType>,
    pub aso_expiry: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrainingSession {
    pub id: i64,
    pub rac_type: RacType,
    pub session_date: NaiveDate,
    pub capacity: i64,
    pub location: String,
    pub instructor: String,
    pub booked_count: i64,
    pub pending_count: i64,
}

impl TrainingSession {
    pub fn seats_left(&self) -> i64 {
        (self.capacity - self.booked_count).max(0)
    }

    /// Seats still open once every pending proposal is approved.
    pub fn unclaimed_seats(&self) -> i64 {
        (self.capacity - self.booked_count - self.pending_count).max(0)
    }
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbTrainingSession {
    pub id: Option<i64>,
    pub rac_type: Option<String>,
    pub session_date: Option<NaiveDate>,
    pub capacity: Option<i64>,
    pub location: Option<String>,
    pub instructor: Option<String>,
    pub booked_count: Option<i64>,
    pub pending_count: Option<i64>,
}

impl TryFrom<DbTrainingSession> for TrainingSession {
    type Error = AppError;

    fn try_from(db: DbTrainingSession) -> Result<Self, Self::Error> {
        Ok(Self {
            id: db.id.unwrap_or_default(),
            rac_type: stored_rac(db.rac_type)?,
            session_date: db
                .session_date
                .ok_or_else(|| AppError::Internal("Training session without a date".into()))?,
            capacity: db.capacity.unwrap_or_default(),
            location: db.location.unwrap_or_default(),
            instructor: db.instructor.unwrap_or_default(),
            booked_count: db.booked_count.unwrap_or_default(),
            pending_count: db.pending_count.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Booking {
    pub id: i64,
    pub session_id: i64,
    pub employee_id: i64,
    pub employee_name: String,
    pub record_id: String,
    pub company: String,
    pub rac_type: RacType,
    pub session_date: NaiveDate,
    pub status: BookingStatus,
    pub theory_score: Option<i64>,
    pub practical_score: Option<i64>,
    pub result_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub auto_booked: bool,
    pub created_at: NaiveDateTime,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbBooking {
    pub id: Option<i64>,
    pub session_id: Option<i64>,
    pub employee_id: Option<i64>,
    pub employee_name: Option<String>,
    pub record_id: Option<String>,
    pub company: Option<String>,
    pub rac_type: Option<String>,
    pub session_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub theory_score: Option<i64>,
    pub practical_score: Option<i64>,
    pub result_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub auto_booked: Option<bool>,
    pub created_at: Option<NaiveDateTime>,
}

impl TryFrom<DbBooking> for Booking {
    type Error = AppError;

    fn try_from(db: DbBooking) -> Result<Self, Self::Error> {
        let status = db.status.unwrap_or_default();
        Ok(Self {
            id: db.id.unwrap_or_default(),
            session_id: db.session_id.unwrap_or_default(),
            employee_id: db.employee_id.unwrap_or_default(),
            employee_name: db.employee_name.unwrap_or_default(),
            record_id: db.record_id.unwrap_or_default(),
            company: db.company.unwrap_or_default(),
            rac_type: stored_rac(db.rac_type)?,
            session_date: db
                .session_date
                .ok_or_else(|| AppError::Internal("Booking without a session date".into()))?,
            status: BookingStatus::from_str(&status)
                .map_err(|e| AppError::Internal(e.to_string()))?,
            theory_score: db.theory_score,
            practical_score: db.practical_score,
            result_date: db.result_date,
            expiry_date: db.expiry_date,
            auto_booked: db.auto_booked.unwrap_or_default(),
            created_at: db.created_at.unwrap_or_default(),
        })
    }
}

/// Latest passed result for an (employee, RAC) pair.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Certificate {
    pub employee_id: i64,
    pub rac_type: RacType,
    pub expiry_date: NaiveDate,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbCertificate {
    pub employee_id: Option<i64>,
    pub rac_type: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

impl TryFrom<DbCertificate> for Certificate {
    type Error = AppError;

    fn try_from(db: DbCertificate) -> Result<Self, Self::Error> {
        Ok(Self {
            employee_id: db.employee_id.unwrap_or_default(),
            rac_type: stored_rac(db.rac_type)?,
            expiry_date: db
                .expiry_date
                .ok_or_else(|| AppError::Internal("Certificate without expiry".into()))?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Notification {
    pub id: i64,
    pub kind: String,
    pub rac_type: Option<RacType>,
    pub message: String,
    pub created_at: NaiveDateTime,
    pub is_read: bool,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbNotification {
    pub id: Option<i64>,
    pub kind: Option<String>,
    pub rac_type: Option<String>,
    pub message: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub is_read: Option<bool>,
}

impl From<DbNotification> for Notification {
    fn from(db: DbNotification) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            kind: db.kind.unwrap_or_default(),
            rac_type: db.rac_type.and_then(|r| RacType::from_str(&r).ok()),
            message: db.message.unwrap_or_default(),
            created_at: db.created_at.unwrap_or_default(),
            is_read: db.is_read.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rac_type_parsing() {
        assert_eq!(RacType::from_str("RAC03").unwrap(), RacType::Rac03);
        assert_eq!(RacType::from_str(" rac11 ").unwrap(), RacType::Rac11);
        assert!(RacType::from_str("RAC12").is_err());
        assert_eq!(
            serde_json::to_string(&RacType::Rac07).unwrap(),
            "\"RAC07\""
        );
    }

    #[test]
    fn test_booking_status_seats() {
        assert!(BookingStatus::Booked.occupies_seat());
        assert!(BookingStatus::Failed.occupies_seat());
        assert!(!BookingStatus::Pending.occupies_seat());
        assert!(!BookingStatus::Cancelled.occupies_seat());
    }

    #[test]
    fn test_session_seat_counts() {
        let session = TrainingSession {
            id: 1,
            rac_type: RacType::Rac01,
            session_date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            capacity: 10,
            location: "Training Center".to_string(),
            instructor: String::new(),
            booked_count: 7,
            pending_count: 5,
        };

        assert_eq!(session.seats_left(), 3);
        assert_eq!(session.unclaimed_seats(), 0);
    }
}
