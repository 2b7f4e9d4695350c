use chrono::{Duration, Months, NaiveDate, Utc};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::auth::Role;
use crate::config::Settings;
use crate::db::{
    book_employee, count_users, create_employee, create_training_session, create_user,
    list_employees, record_booking_results, set_employee_requirement, EmployeeFilter,
    EmployeeInput, ResultInput, TrainingSessionInput,
};
use crate::error::AppError;
use crate::models::RacType;

/// Creates the configured admin account when the user table is empty.
#[instrument(skip(pool, settings))]
pub async fn bootstrap_admin(
    pool: &Pool<Sqlite>,
    settings: &Settings,
) -> Result<Option<i64>, AppError> {
    if count_users(pool).await? > 0 {
        return Ok(None);
    }

    let Some(password) = settings.admin_password.as_deref() else {
        tracing::warn!("No users exist and no admin password is configured");
        return Ok(None);
    };

    let id = create_user(
        pool,
        &settings.admin_username,
        password,
        Role::Admin,
        "Administrator",
        &settings.admin_company,
    )
    .await?;

    info!(
        username = %settings.admin_username,
        company = %settings.admin_company,
        "Created initial admin user"
    );
    Ok(Some(id))
}

struct DemoEmployee {
    record_id: &'static str,
    name: &'static str,
    company: &'static str,
    department: &'static str,
    job_title: &'static str,
    license_class: Option<&'static str>,
    racs: &'static [RacType],
}

const DEMO_EMPLOYEES: [DemoEmployee; 6] = [
    DemoEmployee {
        record_id: "VL-1001",
        name: "Ana Machava",
        company: "Vale",
        department: "Mine Operations",
        job_title: "Haul Truck Operator",
        license_class: Some("C"),
        racs: &[RacType::Rac01, RacType::Rac02, RacType::Rac03],
    },
    DemoEmployee {
        record_id: "VL-1002",
        name: "Bernardo Cossa",
        company: "Vale",
        department: "Maintenance",
        job_title: "Electrician",
        license_class: None,
        racs: &[RacType::Rac01, RacType::Rac05],
    },
    DemoEmployee {
        record_id: "VL-1003",
        name: "Carla Nhantumbo",
        company: "Vale",
        department: "Processing Plant",
        job_title: "Crane Operator",
        license_class: Some("B"),
        racs: &[RacType::Rac04, RacType::Rac06],
    },
    DemoEmployee {
        record_id: "CA-2001",
        name: "Daniel Sitoe",
        company: "Contractor A",
        department: "Civil Works",
        job_title: "Rigger",
        license_class: None,
        racs: &[RacType::Rac01, RacType::Rac06, RacType::Rac08],
    },
    DemoEmployee {
        record_id: "CA-2002",
        name: "Elisa Mondlane",
        company: "Contractor A",
        department: "Drilling",
        job_title: "Shot Firer",
        license_class: Some("C"),
        racs: &[RacType::Rac02, RacType::Rac07, RacType::Rac09],
    },
    DemoEmployee {
        record_id: "CA-2003",
        name: "Fernando Tembe",
        company: "Contractor A",
        department: "Logistics",
        job_title: "Light Vehicle Driver",
        license_class: Some("B"),
        racs: &[RacType::Rac02, RacType::Rac11],
    },
];

fn months_ago(today: NaiveDate, months: u32) -> NaiveDate {
    today.checked_sub_months(Months::new(months)).unwrap_or(today)
}

/// Seeds a small workforce, upcoming sessions and a mix of valid, expiring
/// and expired certificates. Does nothing when employees already exist.
#[instrument(skip(pool, settings))]
pub async fn seed_demo_data(
    pool: &Pool<Sqlite>,
    settings: &Settings,
    today: NaiveDate,
) -> Result<bool, AppError> {
    let existing = list_employees(
        pool,
        &EmployeeFilter {
            include_inactive: true,
            ..EmployeeFilter::default()
        },
    )
    .await?;

    if !existing.is_empty() {
        info!("Employees already present, skipping demo data");
        return Ok(false);
    }

    let mut employee_ids = Vec::with_capacity(DEMO_EMPLOYEES.len());
    for (index, demo) in DEMO_EMPLOYEES.iter().enumerate() {
        let id = create_employee(
            pool,
            &EmployeeInput {
                record_id: demo.record_id.to_string(),
                name: demo.name.to_string(),
                company: demo.company.to_string(),
                department: demo.department.to_string(),
                job_title: demo.job_title.to_string(),
                driver_license_number: demo
                    .license_class
                    .map(|_| format!("DL-{:06}", 100_000 + index * 137)),
                driver_license_class: demo.license_class.map(String::from),
                driver_license_expiry: demo
                    .license_class
                    .map(|_| today + Duration::days(400 + index as i64 * 90)),
                active: true,
            },
        )
        .await?;

        set_employee_requirement(
            pool,
            id,
            demo.racs,
            Some(today + Duration::days(20 + index as i64 * 60)),
        )
        .await?;

        employee_ids.push(id);
    }

    // Results are recorded against sessions held in the past, so those
    // bookings are inserted directly.
    let history = [
        (0, RacType::Rac01, 6),
        (0, RacType::Rac02, 23),
        (1, RacType::Rac01, 12),
        (1, RacType::Rac05, 26),
        (2, RacType::Rac04, 3),
        (3, RacType::Rac01, 23),
        (5, RacType::Rac11, 8),
    ];

    for (employee, rac_type, age_months) in history {
        let session_date = months_ago(today, age_months);
        let session_id = create_training_session(
            pool,
            &TrainingSessionInput {
                rac_type,
                session_date,
                capacity: 20,
                location: "Moatize Training Center".to_string(),
                instructor: "Demo Instructor".to_string(),
            },
        )
        .await?;

        let res = sqlx::query(
            "INSERT INTO bookings (session_id, employee_id, status, auto_booked, created_at)
             VALUES (?, ?, 'booked', FALSE, ?)",
        )
        .bind(session_id)
        .bind(employee_ids[employee])
        .bind(Utc::now().naive_utc())
        .execute(pool)
        .await?;

        record_booking_results(
            pool,
            res.last_insert_rowid(),
            &ResultInput {
                theory_score: 85,
                practical_score: rac_type.requires_practical().then_some(80),
                result_date: None,
            },
            settings.pass_mark,
            settings.certificate_validity_months,
        )
        .await?;
    }

    let upcoming = [
        (RacType::Rac01, 7, 12),
        (RacType::Rac02, 10, 2),
        (RacType::Rac03, 14, 8),
        (RacType::Rac06, 21, 6),
        (RacType::Rac08, 28, 10),
    ];

    for (rac_type, days_ahead, capacity) in upcoming {
        let session_id = create_training_session(
            pool,
            &TrainingSessionInput {
                rac_type,
                session_date: today + Duration::days(days_ahead),
                capacity,
                location: "Moatize Training Center".to_string(),
                instructor: "Demo Instructor".to_string(),
            },
        )
        .await?;

        if rac_type == RacType::Rac08 {
            book_employee(pool, session_id, employee_ids[3], today).await?;
        }
    }

    info!(
        employees = employee_ids.len(),
        "Seeded demo workforce and training sessions"
    );
    Ok(true)
}
