use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument, warn};

use crate::compliance::{
    demand_by_rac, evaluate_employee, plan_auto_bookings, training_needs, EmployeeCompliance,
    RacDemand, TrainingNeed,
};
use crate::config::Settings;
use crate::db::{
    approve_booking, create_notification, create_pending_booking, get_all_requirements,
    get_booking, get_employee, get_employee_requirement, has_unread_notification,
    list_certificates, list_employees, list_training_sessions, upcoming_booked_pairs,
    upcoming_session_pairs,
    EmployeeFilter, CAPACITY_NOTIFICATION,
};
use crate::error::AppError;
use crate::models::{Booking, Employee, EmployeeRequirement};

/// Compliance of every active employee, optionally restricted to one company.
#[instrument(skip(pool, settings))]
pub async fn compliance_snapshot(
    pool: &Pool<Sqlite>,
    settings: &Settings,
    today: NaiveDate,
    company: Option<&str>,
) -> Result<Vec<EmployeeCompliance>, AppError> {
    let employees = list_employees(
        pool,
        &EmployeeFilter {
            company: company.map(String::from),
            ..EmployeeFilter::default()
        },
    )
    .await?;
    let requirements = get_all_requirements(pool).await?;
    let certificates = list_certificates(pool).await?;

    Ok(employees
        .iter()
        .map(|employee| {
            let requirement = requirements
                .get(&employee.id)
                .cloned()
                .unwrap_or_else(|| EmployeeRequirement {
                    employee_id: employee.id,
                    ..EmployeeRequirement::default()
                });
            evaluate_employee(
                employee,
                &requirement,
                &certificates,
                today,
                settings.expiry_warning_days,
            )
        })
        .collect())
}

#[instrument(skip(pool, settings))]
pub async fn employee_compliance(
    pool: &Pool<Sqlite>,
    settings: &Settings,
    today: NaiveDate,
    employee_id: i64,
) -> Result<(Employee, EmployeeCompliance), AppError> {
    let employee = get_employee(pool, employee_id).await?;
    let requirement = get_employee_requirement(pool, employee_id).await?;
    let certificates = list_certificates(pool).await?;

    let compliance = evaluate_employee(
        &employee,
        &requirement,
        &certificates,
        today,
        settings.expiry_warning_days,
    );

    Ok((employee, compliance))
}

#[instrument(skip(pool, settings))]
pub async fn current_training_needs(
    pool: &Pool<Sqlite>,
    settings: &Settings,
    today: NaiveDate,
    company: Option<&str>,
) -> Result<Vec<TrainingNeed>, AppError> {
    let compliances = compliance_snapshot(pool, settings, today, company).await?;
    let already_booked = upcoming_booked_pairs(pool, today).await?;

    Ok(training_needs(&compliances, &already_booked))
}

#[instrument(skip(pool, settings))]
pub async fn demand_report(
    pool: &Pool<Sqlite>,
    settings: &Settings,
    today: NaiveDate,
    company: Option<&str>,
) -> Result<Vec<RacDemand>, AppError> {
    let needs = current_training_needs(pool, settings, today, company).await?;
    let sessions = list_training_sessions(pool, None, Some(today)).await?;

    Ok(demand_by_rac(&needs, &sessions, settings.demand_alert_ratio))
}

/// Raises one unread capacity notification per RAC type whose demand
/// exceeds the free seats. Returns the ids of the notifications created.
#[instrument(skip(pool, settings))]
pub async fn refresh_capacity_notifications(
    pool: &Pool<Sqlite>,
    settings: &Settings,
    today: NaiveDate,
) -> Result<Vec<i64>, AppError> {
    let report = demand_report(pool, settings, today, None).await?;

    let mut created = Vec::new();
    for demand in report.iter().filter(|d| d.alert) {
        if has_unread_notification(pool, CAPACITY_NOTIFICATION, demand.rac_type).await? {
            continue;
        }

        let message = format!(
            "Demand for {} ({}) exceeds available capacity ({})",
            demand.rac_type, demand.demand, demand.capacity
        );
        warn!(rac_type = %demand.rac_type, demand = demand.demand, capacity = demand.capacity, "Training demand exceeds capacity");

        created.push(
            create_notification(pool, CAPACITY_NOTIFICATION, Some(demand.rac_type), &message)
                .await?,
        );
    }

    Ok(created)
}

/// Proposes pending bookings for every open training need and returns them.
#[instrument(skip(pool, settings))]
pub async fn propose_auto_bookings(
    pool: &Pool<Sqlite>,
    settings: &Settings,
    today: NaiveDate,
    company: Option<&str>,
) -> Result<Vec<Booking>, AppError> {
    let needs = current_training_needs(pool, settings, today, company).await?;
    let sessions = list_training_sessions(pool, None, Some(today)).await?;

    let taken = upcoming_session_pairs(pool, today).await?;

    let plan = plan_auto_bookings(&needs, &sessions, &taken);
    info!(needs = needs.len(), proposals = plan.len(), "Auto-booking plan ready");

    let mut proposals = Vec::with_capacity(plan.len());
    for proposal in plan {
        if let Some(id) =
            create_pending_booking(pool, proposal.session_id, proposal.employee_id).await?
        {
            proposals.push(get_booking(pool, id).await?);
        }
    }

    refresh_capacity_notifications(pool, settings, today).await?;

    Ok(proposals)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApprovalFailure {
    pub id: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApprovalOutcome {
    pub approved: Vec<i64>,
    pub failed: Vec<ApprovalFailure>,
}

async fn approve_in_scope(
    pool: &Pool<Sqlite>,
    id: i64,
    company: Option<&str>,
) -> Result<(), AppError> {
    if let Some(company) = company {
        let booking = get_booking(pool, id).await?;
        if booking.company != company {
            return Err(AppError::Authorization(format!(
                "Booking {} belongs to another company",
                id
            )));
        }
    }

    approve_booking(pool, id).await
}

/// Approves each booking in order; a failure does not stop the rest.
#[instrument(skip(pool))]
pub async fn approve_bookings(
    pool: &Pool<Sqlite>,
    ids: &[i64],
    company: Option<&str>,
) -> ApprovalOutcome {
    let mut outcome = ApprovalOutcome::default();

    for id in ids {
        match approve_in_scope(pool, *id, company).await {
            Ok(()) => outcome.approved.push(*id),
            Err(err) => {
                err.log_and_record("Bulk booking approval");
                outcome.failed.push(ApprovalFailure {
                    id: *id,
                    reason: err.to_string(),
                });
            }
        }
    }

    outcome
}
