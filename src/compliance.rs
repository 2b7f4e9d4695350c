//! Derived compliance state. Everything here is a pure function of rows
//! already loaded from the database and the date it is evaluated on.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::AppError;
use crate::models::{Certificate, Employee, EmployeeRequirement, RacType, TrainingSession};

/// Ordered by urgency: `Missing` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    Missing,
    Expired,
    Expiring,
    Valid,
}

impl CertificateStatus {
    pub fn is_current(&self) -> bool {
        matches!(self, CertificateStatus::Valid | CertificateStatus::Expiring)
    }
}

pub fn certificate_status(
    expiry: Option<NaiveDate>,
    today: NaiveDate,
    warning_days: i64,
) -> CertificateStatus {
    match expiry {
        None => CertificateStatus::Missing,
        Some(date) if date < today => CertificateStatus::Expired,
        Some(date) if (date - today).num_days() <= warning_days => CertificateStatus::Expiring,
        Some(_) => CertificateStatus::Valid,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RacCompliance {
    pub rac_type: RacType,
    pub title: String,
    pub required: bool,
    pub status: CertificateStatus,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeCompliance {
    pub employee_id: i64,
    pub record_id: String,
    pub name: String,
    pub company: String,
    pub compliant: bool,
    pub aso_status: CertificateStatus,
    pub aso_expiry: Option<NaiveDate>,
    pub license_status: Option<CertificateStatus>,
    pub racs: Vec<RacCompliance>,
}

impl EmployeeCompliance {
    pub fn rac(&self, rac_type: RacType) -> Option<&RacCompliance> {
        self.racs.iter().find(|r| r.rac_type == rac_type)
    }
}

/// Evaluates one employee. `certificates` may contain other employees'
/// certificates; only this employee's are considered.
pub fn evaluate_employee(
    employee: &Employee,
    requirement: &EmployeeRequirement,
    certificates: &[Certificate],
    today: NaiveDate,
    warning_days: i64,
) -> EmployeeCompliance {
    let mut held: HashMap<RacType, NaiveDate> = HashMap::new();
    for certificate in certificates.iter().filter(|c| c.employee_id == employee.id) {
        held.entry(certificate.rac_type)
            .and_modify(|expiry| *expiry = (*expiry).max(certificate.expiry_date))
            .or_insert(certificate.expiry_date);
    }

    let required: HashSet<RacType> = requirement.required_racs.iter().copied().collect();

    let racs: Vec<RacCompliance> = RacType::ALL
        .iter()
        .filter(|rac| required.contains(rac) || held.contains_key(rac))
        .map(|rac| {
            let expiry_date = held.get(rac).copied();
            RacCompliance {
                rac_type: *rac,
                title: rac.title().to_string(),
                required: required.contains(rac),
                status: certificate_status(expiry_date, today, warning_days),
                expiry_date,
            }
        })
        .collect();

    let aso_status = certificate_status(requirement.aso_expiry, today, warning_days);

    let license_status = if required.iter().any(|rac| rac.requires_driver_license()) {
        Some(certificate_status(
            employee.driver_license_expiry,
            today,
            warning_days,
        ))
    } else {
        None
    };

    let compliant = aso_status.is_current()
        && racs
            .iter()
            .filter(|r| r.required)
            .all(|r| r.status.is_current())
        && license_status.map_or(true, |s| s.is_current());

    EmployeeCompliance {
        employee_id: employee.id,
        record_id: employee.record_id.clone(),
        name: employee.name.clone(),
        company: employee.company.clone(),
        compliant,
        aso_status,
        aso_expiry: requirement.aso_expiry,
        license_status,
        racs,
    }
}

/// Checks the scores of a result and reports whether it is a pass.
pub fn grade(
    rac_type: RacType,
    theory_score: i64,
    practical_score: Option<i64>,
    pass_mark: i64,
) -> Result<bool, AppError> {
    let in_range = |score: i64| (0..=100).contains(&score);

    if !in_range(theory_score) {
        return Err(AppError::Validation(
            "Theory score must be between 0 and 100".to_string(),
        ));
    }

    match practical_score {
        Some(score) if !in_range(score) => Err(AppError::Validation(
            "Practical score must be between 0 and 100".to_string(),
        )),
        None if rac_type.requires_practical() => Err(AppError::Validation(format!(
            "{} requires a practical score",
            rac_type
        ))),
        Some(score) => Ok(theory_score >= pass_mark && score >= pass_mark),
        None => Ok(theory_score >= pass_mark),
    }
}

pub fn certificate_expiry(result_date: NaiveDate, validity_months: u32) -> Result<NaiveDate, AppError> {
    result_date
        .checked_add_months(Months::new(validity_months))
        .ok_or_else(|| AppError::Validation("Certificate expiry is out of range".to_string()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingNeed {
    pub employee_id: i64,
    pub company: String,
    pub rac_type: RacType,
    pub status: CertificateStatus,
    pub expiry_date: Option<NaiveDate>,
}

/// Required RACs that are not comfortably valid, minus the ones already
/// covered by a pending or booked upcoming session.
pub fn training_needs(
    compliances: &[EmployeeCompliance],
    already_booked: &HashSet<(i64, RacType)>,
) -> Vec<TrainingNeed> {
    compliances
        .iter()
        .flat_map(|compliance| {
            compliance
                .racs
                .iter()
                .filter(|r| r.required && r.status != CertificateStatus::Valid)
                .filter(|r| !already_booked.contains(&(compliance.employee_id, r.rac_type)))
                .map(|r| TrainingNeed {
                    employee_id: compliance.employee_id,
                    company: compliance.company.clone(),
                    rac_type: r.rac_type,
                    status: r.status,
                    expiry_date: r.expiry_date,
                })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RacDemand {
    pub rac_type: RacType,
    pub demand: i64,
    pub capacity: i64,
    pub alert: bool,
}

pub fn exceeds_threshold(demand: i64, capacity: i64, ratio: f64) -> bool {
    demand > 0 && (demand as f64) > (capacity as f64) * ratio
}

/// Demand against free seats for every RAC type. `sessions` should already be
/// limited to upcoming sessions.
pub fn demand_by_rac(
    needs: &[TrainingNeed],
    sessions: &[TrainingSession],
    ratio: f64,
) -> Vec<RacDemand> {
    let mut demand: HashMap<RacType, i64> = HashMap::new();
    for need in needs {
        *demand.entry(need.rac_type).or_default() += 1;
    }

    let mut capacity: HashMap<RacType, i64> = HashMap::new();
    for session in sessions {
        *capacity.entry(session.rac_type).or_default() += session.unclaimed_seats();
    }

    RacType::ALL
        .iter()
        .map(|rac| {
            let demand = demand.get(rac).copied().unwrap_or_default();
            let capacity = capacity.get(rac).copied().unwrap_or_default();
            RacDemand {
                rac_type: *rac,
                demand,
                capacity,
                alert: exceeds_threshold(demand, capacity, ratio),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedBooking {
    pub employee_id: i64,
    pub session_id: i64,
    pub rac_type: RacType,
}

/// Assigns each need to the earliest session of its RAC type with an
/// unclaimed seat. Missing and expired certificates are served before
/// expiring ones, earliest expiry first. `taken` holds the
/// (employee, session) pairs that already have a non-cancelled booking;
/// those sessions are skipped for that employee.
pub fn plan_auto_bookings(
    needs: &[TrainingNeed],
    sessions: &[TrainingSession],
    taken: &HashSet<(i64, i64)>,
) -> Vec<ProposedBooking> {
    let mut ordered: Vec<&TrainingNeed> = needs.iter().collect();
    ordered.sort_by(|a, b| {
        a.status
            .cmp(&b.status)
            .then_with(|| a.expiry_date.cmp(&b.expiry_date))
            .then_with(|| a.employee_id.cmp(&b.employee_id))
    });

    let mut by_rac: BTreeMap<RacType, Vec<(i64, NaiveDate, i64)>> = BTreeMap::new();
    for session in sessions {
        by_rac.entry(session.rac_type).or_default().push((
            session.id,
            session.session_date,
            session.unclaimed_seats(),
        ));
    }
    for slots in by_rac.values_mut() {
        slots.sort_by_key(|(id, date, _)| (*date, *id));
    }

    let mut proposals = Vec::new();
    for need in ordered {
        let Some(slots) = by_rac.get_mut(&need.rac_type) else {
            continue;
        };

        if let Some(slot) = slots
            .iter_mut()
            .find(|(id, _, free)| *free > 0 && !taken.contains(&(need.employee_id, *id)))
        {
            slot.2 -= 1;
            proposals.push(ProposedBooking {
                employee_id: need.employee_id,
                session_id: slot.0,
                rac_type: need.rac_type,
            });
        }
    }

    proposals
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardEntry {
    pub rac_type: RacType,
    pub title: String,
    pub expiry_date: NaiveDate,
}

/// The wallet card printed for an employee: only currently valid RACs appear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceCard {
    pub employee_id: i64,
    pub record_id: String,
    pub name: String,
    pub company: String,
    pub department: String,
    pub job_title: String,
    pub racs: Vec<CardEntry>,
    pub aso_expiry: Option<NaiveDate>,
    pub driver_license_class: Option<String>,
    pub driver_license_expiry: Option<NaiveDate>,
    pub compliant: bool,
    pub issued_on: NaiveDate,
}

pub fn build_card(
    employee: &Employee,
    compliance: &EmployeeCompliance,
    today: NaiveDate,
) -> ComplianceCard {
    let racs = compliance
        .racs
        .iter()
        .filter(|r| r.status.is_current())
        .filter_map(|r| {
            r.expiry_date.map(|expiry_date| CardEntry {
                rac_type: r.rac_type,
                title: r.title.clone(),
                expiry_date,
            })
        })
        .collect();

    ComplianceCard {
        employee_id: employee.id,
        record_id: employee.record_id.clone(),
        name: employee.name.clone(),
        company: employee.company.clone(),
        department: employee.department.clone(),
        job_title: employee.job_title.clone(),
        racs,
        aso_expiry: compliance.aso_expiry,
        driver_license_class: employee.driver_license_class.clone(),
        driver_license_expiry: employee.driver_license_expiry,
        compliant: compliance.compliant,
        issued_on: today,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RacSummary {
    pub rac_type: Option<RacType>,
    pub required: i64,
    pub valid: i64,
    pub expiring: i64,
    pub expired: i64,
    pub missing: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySummary {
    pub company: String,
    pub employees: i64,
    pub compliant: i64,
    pub compliance_rate: f64,
    pub racs: Vec<RacSummary>,
}

/// Per-company roll-up, companies in alphabetical order. Only required RACs
/// are counted.
pub fn summarize(compliances: &[EmployeeCompliance]) -> Vec<CompanySummary> {
    let mut companies: BTreeMap<&str, Vec<&EmployeeCompliance>> = BTreeMap::new();
    for compliance in compliances {
        companies
            .entry(compliance.company.as_str())
            .or_default()
            .push(compliance);
    }

    companies
        .into_iter()
        .map(|(company, members)| {
            let employees = members.len() as i64;
            let compliant = members.iter().filter(|m| m.compliant).count() as i64;

            let racs = RacType::ALL
                .iter()
                .filter_map(|rac| {
                    let mut summary = RacSummary {
                        rac_type: Some(*rac),
                        ..RacSummary::default()
                    };
                    for entry in members
                        .iter()
                        .filter_map(|m| m.rac(*rac))
                        .filter(|r| r.required)
                    {
                        summary.required += 1;
                        match entry.status {
                            CertificateStatus::Valid => summary.valid += 1,
                            CertificateStatus::Expiring => summary.expiring += 1,
                            CertificateStatus::Expired => summary.expired += 1,
                            CertificateStatus::Missing => summary.missing += 1,
                        }
                    }
                    (summary.required > 0).then_some(summary)
                })
                .collect();

            let compliance_rate = if employees == 0 {
                0.0
            } else {
                (compliant as f64 / employees as f64 * 1000.0).round() / 10.0
            };

            CompanySummary {
                company: company.to_string(),
                employees,
                compliant,
                compliance_rate,
                racs,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiringCertificate {
    pub employee_id: i64,
    pub record_id: String,
    pub name: String,
    pub company: String,
    pub rac_type: RacType,
    pub expiry_date: NaiveDate,
    pub days_left: i64,
}

pub fn expiring_certificates(
    compliances: &[EmployeeCompliance],
    today: NaiveDate,
    within_days: i64,
) -> Vec<ExpiringCertificate> {
    let mut expiring: Vec<ExpiringCertificate> = compliances
        .iter()
        .flat_map(|compliance| {
            compliance.racs.iter().filter_map(move |r| {
                let expiry_date = r.expiry_date?;
                let days_left = (expiry_date - today).num_days();
                (0..=within_days)
                    .contains(&days_left)
                    .then(|| ExpiringCertificate {
                        employee_id: compliance.employee_id,
                        record_id: compliance.record_id.clone(),
                        name: compliance.name.clone(),
                        company: compliance.company.clone(),
                        rac_type: r.rac_type,
                        expiry_date,
                        days_left,
                    })
            })
        })
        .collect();

    expiring.sort_by(|a, b| {
        a.expiry_date
            .cmp(&b.expiry_date)
            .then_with(|| a.name.cmp(&b.name))
    });
    expiring
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn employee(id: i64, company: &str) -> Employee {
        Employee {
            id,
            record_id: format!("EMP-{}", id),
            name: format!("Employee {}", id),
            company: company.to_string(),
            department: "Plant".to_string(),
            job_title: "Operator".to_string(),
            driver_license_number: None,
            driver_license_class: None,
            driver_license_expiry: None,
            active: true,
        }
    }

    fn requirement(id: i64, racs: &[RacType], aso_days: Option<i64>) -> EmployeeRequirement {
        EmployeeRequirement {
            employee_id: id,
            required_racs: racs.to_vec(),
            aso_expiry: aso_days.map(|d| today() + Duration::days(d)),
        }
    }

    fn certificate(employee_id: i64, rac_type: RacType, days: i64) -> Certificate {
        Certificate {
            employee_id,
            rac_type,
            expiry_date: today() + Duration::days(days),
        }
    }

    fn session(id: i64, rac_type: RacType, days: i64, capacity: i64) -> TrainingSession {
        TrainingSession {
            id,
            rac_type,
            session_date: today() + Duration::days(days),
            capacity,
            location: "Training Center".to_string(),
            instructor: String::new(),
            booked_count: 0,
            pending_count: 0,
        }
    }

    #[test]
    fn test_certificate_status_boundaries() {
        let t = today();
        assert_eq!(certificate_status(None, t, 30), CertificateStatus::Missing);
        assert_eq!(
            certificate_status(Some(t - Duration::days(1)), t, 30),
            CertificateStatus::Expired
        );
        assert_eq!(certificate_status(Some(t), t, 30), CertificateStatus::Expiring);
        assert_eq!(
            certificate_status(Some(t + Duration::days(30)), t, 30),
            CertificateStatus::Expiring
        );
        assert_eq!(
            certificate_status(Some(t + Duration::days(31)), t, 30),
            CertificateStatus::Valid
        );
    }

    #[test]
    fn test_employee_compliant_when_all_required_current() {
        let e = employee(1, "Vale");
        let req = requirement(1, &[RacType::Rac01, RacType::Rac05], Some(200));
        let certs = vec![
            certificate(1, RacType::Rac01, 400),
            certificate(1, RacType::Rac05, 10),
            certificate(2, RacType::Rac05, 400),
        ];

        let result = evaluate_employee(&e, &req, &certs, today(), 30);

        assert!(result.compliant);
        assert_eq!(result.racs.len(), 2);
        assert_eq!(
            result.rac(RacType::Rac05).unwrap().status,
            CertificateStatus::Expiring
        );
        assert_eq!(result.license_status, None);
    }

    #[test]
    fn test_employee_not_compliant_without_aso_or_license() {
        let mut e = employee(1, "Vale");
        let req = requirement(1, &[RacType::Rac02], None);
        let certs = vec![certificate(1, RacType::Rac02, 400)];

        let result = evaluate_employee(&e, &req, &certs, today(), 30);
        assert!(!result.compliant);
        assert_eq!(result.aso_status, CertificateStatus::Missing);
        assert_eq!(result.license_status, Some(CertificateStatus::Missing));

        let req = requirement(1, &[RacType::Rac02], Some(100));
        e.driver_license_expiry = Some(today() + Duration::days(100));
        let result = evaluate_employee(&e, &req, &certs, today(), 30);
        assert!(result.compliant);
    }

    #[test]
    fn test_latest_certificate_wins_and_unrequired_is_listed() {
        let e = employee(1, "Vale");
        let req = requirement(1, &[], Some(100));
        let certs = vec![
            certificate(1, RacType::Rac04, -10),
            certificate(1, RacType::Rac04, 300),
        ];

        let result = evaluate_employee(&e, &req, &certs, today(), 30);

        let rac = result.rac(RacType::Rac04).unwrap();
        assert!(!rac.required);
        assert_eq!(rac.status, CertificateStatus::Valid);
        assert!(result.compliant);
    }

    #[test]
    fn test_grade() {
        assert!(grade(RacType::Rac01, 70, None, 70).unwrap());
        assert!(!grade(RacType::Rac01, 69, None, 70).unwrap());
        assert!(!grade(RacType::Rac02, 90, Some(50), 70).unwrap());
        assert!(grade(RacType::Rac02, 90, Some(85), 70).unwrap());
        assert!(grade(RacType::Rac02, 90, None, 70).is_err());
        assert!(grade(RacType::Rac01, 101, None, 70).is_err());
        assert!(grade(RacType::Rac01, 80, Some(-1), 70).is_err());
    }

    #[test]
    fn test_certificate_expiry_adds_months() {
        let result_date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            certificate_expiry(result_date, 24).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
        );
    }

    #[test]
    fn test_training_needs_skip_valid_and_booked() {
        let compliances: Vec<EmployeeCompliance> = vec![
            evaluate_employee(
                &employee(1, "Vale"),
                &requirement(1, &[RacType::Rac01, RacType::Rac03], Some(100)),
                &[certificate(1, RacType::Rac01, 300)],
                today(),
                30,
            ),
            evaluate_employee(
                &employee(2, "Vale"),
                &requirement(2, &[RacType::Rac03], Some(100)),
                &[certificate(2, RacType::Rac03, 5)],
                today(),
                30,
            ),
        ];

        let mut booked = HashSet::new();
        let needs = training_needs(&compliances, &booked);
        assert_eq!(needs.len(), 2);
        assert!(needs.iter().all(|n| n.rac_type == RacType::Rac03));

        booked.insert((2, RacType::Rac03));
        let needs = training_needs(&compliances, &booked);
        assert_eq!(needs.len(), 1);
        assert_eq!(needs[0].employee_id, 1);
        assert_eq!(needs[0].status, CertificateStatus::Missing);
    }

    #[test]
    fn test_demand_alerts_when_over_capacity() {
        let needs: Vec<TrainingNeed> = (1..=3)
            .map(|id| TrainingNeed {
                employee_id: id,
                company: "Vale".to_string(),
                rac_type: RacType::Rac06,
                status: CertificateStatus::Missing,
                expiry_date: None,
            })
            .collect();
        let mut partly_taken = session(2, RacType::Rac06, 20, 4);
        partly_taken.booked_count = 3;
        let sessions = vec![session(1, RacType::Rac06, 10, 1), partly_taken];

        let report = demand_by_rac(&needs, &sessions, 1.0);
        assert_eq!(report.len(), RacType::ALL.len());

        let rac06 = report.iter().find(|d| d.rac_type == RacType::Rac06).unwrap();
        assert_eq!(rac06.demand, 3);
        assert_eq!(rac06.capacity, 2);
        assert!(rac06.alert);

        let rac01 = report.iter().find(|d| d.rac_type == RacType::Rac01).unwrap();
        assert!(!rac01.alert);

        assert!(!exceeds_threshold(3, 4, 1.0));
        assert!(exceeds_threshold(3, 4, 0.5));
        assert!(exceeds_threshold(1, 0, 1.0));
        assert!(!exceeds_threshold(0, 0, 1.0));
    }

    #[test]
    fn test_plan_auto_bookings_prioritises_and_respects_capacity() {
        let needs = vec![
            TrainingNeed {
                employee_id: 1,
                company: "Vale".to_string(),
                rac_type: RacType::Rac01,
                status: CertificateStatus::Expiring,
                expiry_date: Some(today() + Duration::days(20)),
            },
            TrainingNeed {
                employee_id: 2,
                company: "Vale".to_string(),
                rac_type: RacType::Rac01,
                status: CertificateStatus::Missing,
                expiry_date: None,
            },
            TrainingNeed {
                employee_id: 3,
                company: "Vale".to_string(),
                rac_type: RacType::Rac01,
                status: CertificateStatus::Expired,
                expiry_date: Some(today() - Duration::days(3)),
            },
            TrainingNeed {
                employee_id: 4,
                company: "Vale".to_string(),
                rac_type: RacType::Rac09,
                status: CertificateStatus::Missing,
                expiry_date: None,
            },
        ];
        let mut nearly_full = session(10, RacType::Rac01, 5, 2);
        nearly_full.pending_count = 1;
        let sessions = vec![session(11, RacType::Rac01, 15, 1), nearly_full];

        let plan = plan_auto_bookings(&needs, &sessions, &HashSet::new());

        assert_eq!(
            plan,
            vec![
                ProposedBooking {
                    employee_id: 2,
                    session_id: 10,
                    rac_type: RacType::Rac01
                },
                ProposedBooking {
                    employee_id: 3,
                    session_id: 11,
                    rac_type: RacType::Rac01
                },
            ]
        );
    }

    #[test]
    fn test_plan_auto_bookings_skips_sessions_already_attended() {
        let needs = vec![TrainingNeed {
            employee_id: 7,
            company: "Vale".to_string(),
            rac_type: RacType::Rac01,
            status: CertificateStatus::Missing,
            expiry_date: None,
        }];
        let sessions = vec![
            session(20, RacType::Rac01, 0, 10),
            session(21, RacType::Rac01, 7, 10),
        ];
        let taken: HashSet<(i64, i64)> = [(7, 20)].into_iter().collect();

        let plan = plan_auto_bookings(&needs, &sessions, &taken);

        assert_eq!(
            plan,
            vec![ProposedBooking {
                employee_id: 7,
                session_id: 21,
                rac_type: RacType::Rac01
            }]
        );
    }

    #[test]
    fn test_card_lists_only_current_racs() {
        let e = employee(1, "Vale");
        let req = requirement(1, &[RacType::Rac01, RacType::Rac04], Some(100));
        let certs = vec![
            certificate(1, RacType::Rac01, 100),
            certificate(1, RacType::Rac04, -1),
        ];
        let compliance = evaluate_employee(&e, &req, &certs, today(), 30);

        let card = build_card(&e, &compliance, today());

        assert_eq!(card.racs.len(), 1);
        assert_eq!(card.racs[0].rac_type, RacType::Rac01);
        assert!(!card.compliant);
        assert_eq!(card.issued_on, today());
    }

    #[test]
    fn test_summary_and_expiring_report() {
        let compliances = vec![
            evaluate_employee(
                &employee(1, "Vale"),
                &requirement(1, &[RacType::Rac01], Some(100)),
                &[certificate(1, RacType::Rac01, 10)],
                today(),
                30,
            ),
            evaluate_employee(
                &employee(2, "Vale"),
                &requirement(2, &[RacType::Rac01], Some(100)),
                &[],
                today(),
                30,
            ),
            evaluate_employee(
                &employee(3, "Contractor"),
                &requirement(3, &[RacType::Rac08], Some(100)),
                &[certificate(3, RacType::Rac08, 3)],
                today(),
                30,
            ),
        ];

        let summary = summarize(&compliances);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].company, "Contractor");
        let vale = &summary[1];
        assert_eq!(vale.employees, 2);
        assert_eq!(vale.compliant, 1);
        assert_eq!(vale.compliance_rate, 50.0);
        assert_eq!(vale.racs.len(), 1);
        assert_eq!(vale.racs[0].expiring, 1);
        assert_eq!(vale.racs[0].missing, 1);

        let expiring = expiring_certificates(&compliances, today(), 30);
        assert_eq!(expiring.len(), 2);
        assert_eq!(expiring[0].employee_id, 3);
        assert_eq!(expiring[0].days_left, 3);

        let expiring = expiring_certificates(&compliances, today(), 5);
        assert_eq!(expiring.len(), 1);
    }
}
