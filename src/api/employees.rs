use chrono::NaiveDate;
use rocket::State;
use rocket::http::Status;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{Permission, User};
use crate::compliance::{build_card, ComplianceCard, EmployeeCompliance};
use crate::config::Settings;
use crate::db::{
    create_employee, delete_employee, get_employee, get_employee_requirement, list_bookings,
    list_employees, set_employee_requirement, update_employee, BookingFilter, EmployeeFilter,
    EmployeeInput,
};
use crate::error::AppError;
use crate::models::{parse_rac, Booking, Employee, EmployeeRequirement, RacType};
use crate::planning::employee_compliance;
use crate::validation::{ApiError, AppErrorExt, JsonValidateExt, PermissionCheckExt, RECORD_ID_RE};

use super::today;

/// Loads an employee and checks the caller may see their company.
async fn scoped_employee(
    db: &Pool<Sqlite>,
    user: &User,
    id: i64,
) -> Result<Employee, AppError> {
    let employee = get_employee(db, id).await?;

    if !user.can_access_company(&employee.company) {
        return Err(AppError::Authorization(format!(
            "Employee {} belongs to another company",
            employee.record_id
        )));
    }

    Ok(employee)
}

#[derive(FromForm)]
pub struct EmployeesQueryParams {
    company: Option<String>,
    search: Option<String>,
    include_inactive: Option<bool>,
}

#[get("/employees?<params..>")]
pub async fn api_get_employees(
    params: EmployeesQueryParams,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<Employee>>, Status> {
    user.require_permission(Permission::ViewEmployees)?;

    let company = match (user.company_scope(), params.company) {
        (Some(own), Some(requested)) if requested != own => return Err(Status::Forbidden),
        (Some(own), _) => Some(own.to_string()),
        (None, requested) => requested,
    };

    let employees = list_employees(
        db,
        &EmployeeFilter {
            company,
            search: params.search,
            include_inactive: params.include_inactive.unwrap_or(false),
        },
    )
    .await?;

    Ok(Json(employees))
}

#[get("/employees/<id>")]
pub async fn api_get_employee(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Employee>, Status> {
    user.require_permission(Permission::ViewEmployees)?;

    let employee = scoped_employee(db, &user, id).await?;

    Ok(Json(employee))
}

#[derive(Deserialize, Validate, Clone)]
pub struct EmployeeRequest {
    #[validate(regex(
        path = *RECORD_ID_RE,
        message = "Record id must be 2-32 letters, digits or dashes"
    ))]
    record_id: String,
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    name: String,
    #[validate(length(min = 1, max = 100, message = "Company is required"))]
    company: String,
    #[serde(default)]
    #[validate(length(max = 100, message = "Department must be at most 100 characters"))]
    department: String,
    #[serde(default)]
    #[validate(length(max = 100, message = "Job title must be at most 100 characters"))]
    job_title: String,
    driver_license_number: Option<String>,
    driver_license_class: Option<String>,
    driver_license_expiry: Option<NaiveDate>,
    active: Option<bool>,
}

impl From<EmployeeRequest> for EmployeeInput {
    fn from(request: EmployeeRequest) -> Self {
        Self {
            record_id: request.record_id.trim().to_string(),
            name: request.name.trim().to_string(),
            company: request.company.trim().to_string(),
            department: request.department,
            job_title: request.job_title,
            driver_license_number: request.driver_license_number.filter(|s| !s.is_empty()),
            driver_license_class: request.driver_license_class.filter(|s| !s.is_empty()),
            driver_license_expiry: request.driver_license_expiry,
            active: request.active.unwrap_or(true),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: i64,
}

#[post("/employees", data = "<employee>")]
pub async fn api_create_employee(
    employee: Json<EmployeeRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<CreatedResponse>, ApiError> {
    user.require_permission(Permission::ManageEmployees)
        .validate_custom()?;
    let input = EmployeeInput::from(employee.validate_custom()?);
    user.require_company(&input.company).validate_custom()?;

    let id = create_employee(db, &input).await.validate_custom()?;

    Ok(Json(CreatedResponse { id }))
}

#[put("/employees/<id>", data = "<employee>")]
pub async fn api_update_employee(
    id: i64,
    employee: Json<EmployeeRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, ApiError> {
    user.require_permission(Permission::ManageEmployees)
        .validate_custom()?;
    let input = EmployeeInput::from(employee.validate_custom()?);

    scoped_employee(db, &user, id).await.validate_custom()?;
    user.require_company(&input.company).validate_custom()?;

    update_employee(db, id, &input).await.validate_custom()?;

    Ok(Status::Ok)
}

#[delete("/employees/<id>")]
pub async fn api_delete_employee(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Status> {
    user.require_permission(Permission::ManageEmployees)?;

    scoped_employee(db, &user, id).await?;
    delete_employee(db, id).await?;

    Ok(Status::Ok)
}

#[get("/employees/<id>/requirements")]
pub async fn api_get_requirements(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<EmployeeRequirement>, Status> {
    user.require_permission(Permission::ViewEmployees)?;

    scoped_employee(db, &user, id).await?;
    let requirement = get_employee_requirement(db, id).await?;

    Ok(Json(requirement))
}

#[derive(Deserialize, Validate)]
pub struct RequirementRequest {
    #[serde(default)]
    #[validate(length(max = 11, message = "At most 11 RAC types can be required"))]
    required_racs: Vec<String>,
    aso_expiry: Option<NaiveDate>,
}

#[put("/employees/<id>/requirements", data = "<requirement>")]
pub async fn api_set_requirements(
    id: i64,
    requirement: Json<RequirementRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<EmployeeRequirement>, ApiError> {
    user.require_permission(Permission::ManageEmployees)
        .validate_custom()?;
    let requirement = requirement.validate_custom()?;

    scoped_employee(db, &user, id).await.validate_custom()?;

    let racs = requirement
        .required_racs
        .iter()
        .map(|rac| parse_rac(rac))
        .collect::<Result<Vec<RacType>, _>>()
        .validate_custom()?;

    set_employee_requirement(db, id, &racs, requirement.aso_expiry)
        .await
        .validate_custom()?;

    let stored = get_employee_requirement(db, id).await.validate_custom()?;

    Ok(Json(stored))
}

#[get("/employees/<id>/bookings")]
pub async fn api_get_employee_bookings(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<Booking>>, Status> {
    user.require_all_permissions(&[Permission::ViewEmployees, Permission::ViewBookings])?;

    scoped_employee(db, &user, id).await?;
    let bookings = list_bookings(
        db,
        &BookingFilter {
            employee_id: Some(id),
            ..BookingFilter::default()
        },
    )
    .await?;

    Ok(Json(bookings))
}

#[get("/employees/<id>/compliance")]
pub async fn api_get_employee_compliance(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
    settings: &State<Settings>,
) -> Result<Json<EmployeeCompliance>, Status> {
    user.require_permission(Permission::ViewReports)?;

    scoped_employee(db, &user, id).await?;
    let (_, compliance) = employee_compliance(db, settings, today(), id).await?;

    Ok(Json(compliance))
}

#[get("/employees/<id>/card")]
pub async fn api_get_compliance_card(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
    settings: &State<Settings>,
) -> Result<Json<ComplianceCard>, Status> {
    user.require_permission(Permission::ViewReports)?;

    scoped_employee(db, &user, id).await?;
    let today = today();
    let (employee, compliance) = employee_compliance(db, settings, today, id).await?;

    Ok(Json(build_card(&employee, &compliance, today)))
}
