use chrono::NaiveDate;
use sqlx::{Pool, QueryBuilder, Sqlite};
use std::collections::HashMap;
use tracing::{info, instrument};

use super::unique_conflict;
use crate::error::AppError;
use crate::models::{DbEmployee, Employee, EmployeeRequirement, RacType};

const EMPLOYEE_COLUMNS: &str = "id, record_id, name, company, department, job_title, \
     driver_license_number, driver_license_class, driver_license_expiry, active";

#[derive(Debug, Clone, Default)]
pub struct EmployeeFilter {
    pub company: Option<String>,
    pub search: Option<String>,
    pub include_inactive: bool,
}

#[derive(Debug, Clone)]
pub struct EmployeeInput {
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

#[instrument(skip(pool))]
pub async fn list_employees(
    pool: &Pool<Sqlite>,
    filter: &EmployeeFilter,
) -> Result<Vec<Employee>, AppError> {
    info!("Listing employees");
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {} FROM employees WHERE 1 = 1",
        EMPLOYEE_COLUMNS
    ));

    if let Some(company) = &filter.company {
        query.push(" AND company = ").push_bind(company.clone());
    }

    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        query
            .push(" AND (name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR record_id LIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if !filter.include_inactive {
        query.push(" AND active = TRUE");
    }

    query.push(" ORDER BY name, id");

    let rows = query
        .build_query_as::<DbEmployee>()
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(Employee::from).collect())
}

#[instrument(skip(pool))]
pub async fn get_employee(pool: &Pool<Sqlite>, id: i64) -> Result<Employee, AppError> {
    let row = sqlx::query_as::<_, DbEmployee>(&format!(
        "SELECT {} FROM employees WHERE id = ?",
        EMPLOYEE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(employee) => Ok(Employee::from(employee)),
        _ => Err(AppError::NotFound(format!("Employee with id {} not found", id))),
    }
}

fn record_id_taken(record_id: &str) -> String {
    format!("Employee record id '{}' already exists", record_id)
}

async fn ensure_record_id_free(
    pool: &Pool<Sqlite>,
    record_id: &str,
    except_id: Option<i64>,
) -> Result<(), AppError> {
    let existing: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM employees WHERE record_id = ? AND id != ?")
            .bind(record_id)
            .bind(except_id.unwrap_or(-1))
            .fetch_optional(pool)
            .await?;

    if existing.is_some() {
        return Err(AppError::Conflict(record_id_taken(record_id)));
    }

    Ok(())
}

#[instrument(skip(pool))]
pub async fn create_employee(pool: &Pool<Sqlite>, input: &EmployeeInput) -> Result<i64, AppError> {
    info!("Creating employee");
    ensure_record_id_free(pool, &input.record_id, None).await?;

    let res = sqlx::query(
        "INSERT INTO employees (record_id, name, company, department, job_title,
             driver_license_number, driver_license_class, driver_license_expiry, active)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&input.record_id)
    .bind(&input.name)
    .bind(&input.company)
    .bind(&input.department)
    .bind(&input.job_title)
    .bind(&input.driver_license_number)
    .bind(&input.driver_license_class)
    .bind(input.driver_license_expiry)
    .bind(input.active)
    .execute(pool)
    .await
    .map_err(|e| unique_conflict(e, || record_id_taken(&input.record_id)))?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn update_employee(
    pool: &Pool<Sqlite>,
    id: i64,
    input: &EmployeeInput,
) -> Result<(), AppError> {
    info!("Updating employee");
    get_employee(pool, id).await?;
    ensure_record_id_free(pool, &input.record_id, Some(id)).await?;

    sqlx::query(
        "UPDATE employees
         SET record_id = ?, name = ?, company = ?, department = ?, job_title = ?,
             driver_license_number = ?, driver_license_class = ?, driver_license_expiry = ?,
             active = ?
         WHERE id = ?",
    )
    .bind(&input.record_id)
    .bind(&input.name)
    .bind(&input.company)
    .bind(&input.department)
    .bind(&input.job_title)
    .bind(&input.driver_license_number)
    .bind(&input.driver_license_class)
    .bind(input.driver_license_expiry)
    .bind(input.active)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| unique_conflict(e, || record_id_taken(&input.record_id)))?;

    Ok(())
}

/// Deletes the employee together with their bookings and requirements.
#[instrument(skip(pool))]
pub async fn delete_employee(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting employee");
    let res = sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Employee with id {} not found", id)));
    }

    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_employee_requirement(
    pool: &Pool<Sqlite>,
    employee_id: i64,
) -> Result<EmployeeRequirement, AppError> {
    let aso: Option<(Option<NaiveDate>,)> =
        sqlx::query_as("SELECT aso_expiry FROM employee_requirements WHERE employee_id = ?")
            .bind(employee_id)
            .fetch_optional(pool)
            .await?;

    let racs: Vec<(String,)> = sqlx::query_as(
        "SELECT rac_type FROM employee_required_racs WHERE employee_id = ? ORDER BY rac_type",
    )
    .bind(employee_id)
    .fetch_all(pool)
    .await?;

    let required_racs = racs
        .into_iter()
        .map(|(rac,)| RacType::from_str(&rac).map_err(|e| AppError::Internal(e.to_string())))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EmployeeRequirement {
        employee_id,
        required_racs,
        aso_expiry: aso.and_then(|(date,)| date),
    })
}

/// Replaces the employee's required RACs and ASO expiry.
#[instrument(skip(pool))]
pub async fn set_employee_requirement(
    pool: &Pool<Sqlite>,
    employee_id: i64,
    required_racs: &[RacType],
    aso_expiry: Option<NaiveDate>,
) -> Result<(), AppError> {
    info!("Setting employee requirements");
    get_employee(pool, employee_id).await?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO employee_requirements (employee_id, aso_expiry) VALUES (?, ?)
         ON CONFLICT (employee_id) DO UPDATE SET aso_expiry = excluded.aso_expiry",
    )
    .bind(employee_id)
    .bind(aso_expiry)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM employee_required_racs WHERE employee_id = ?")
        .bind(employee_id)
        .execute(&mut *tx)
        .await?;

    for rac in required_racs {
        sqlx::query(
            "INSERT OR IGNORE INTO employee_required_racs (employee_id, rac_type) VALUES (?, ?)",
        )
        .bind(employee_id)
        .bind(rac.as_str())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(())
}

/// Requirements for every employee that has any, keyed by employee id.
#[instrument(skip(pool))]
pub async fn get_all_requirements(
    pool: &Pool<Sqlite>,
) -> Result<HashMap<i64, EmployeeRequirement>, AppError> {
    let mut requirements: HashMap<i64, EmployeeRequirement> = HashMap::new();

    let aso_rows: Vec<(i64, Option<NaiveDate>)> =
        sqlx::query_as("SELECT employee_id, aso_expiry FROM employee_requirements")
            .fetch_all(pool)
            .await?;

    for (employee_id, aso_expiry) in aso_rows {
        requirements
            .entry(employee_id)
            .or_insert_with(|| EmployeeRequirement {
                employee_id,
                ..EmployeeRequirement::default()
            })
            .aso_expiry = aso_expiry;
    }

    let rac_rows: Vec<(i64, String)> = sqlx::query_as(
        "SELECT employee_id, rac_type FROM employee_required_racs ORDER BY employee_id, rac_type",
    )
    .fetch_all(pool)
    .await?;

    for (employee_id, rac) in rac_rows {
        let rac = RacType::from_str(&rac).map_err(|e| AppError::Internal(e.to_string()))?;
        requirements
            .entry(employee_id)
            .or_insert_with(|| EmployeeRequirement {
                employee_id,
                ..EmployeeRequirement::default()
            })
            .required_racs
            .push(rac);
    }

    Ok(requirements)
}
