#[cfg(test)]
mod tests {
    use crate::db::{
        EmployeeFilter, EmployeeInput, create_employee, delete_employee, get_all_requirements,
        get_employee, get_employee_requirement, list_bookings, list_employees,
        set_employee_requirement, unique_conflict, update_employee, BookingFilter,
    };
    use crate::error::AppError;
    use crate::models::RacType;
    use crate::test::test_utils::{TestDbBuilder, create_standard_test_db, days_from_today};
    use rocket::tokio;

    fn input(record_id: &str, name: &str, company: &str) -> EmployeeInput {
        EmployeeInput {
            record_id: record_id.to_string(),
            name: name.to_string(),
            company: company.to_string(),
            department: "Mine Operations".to_string(),
            job_title: "Operator".to_string(),
            driver_license_number: None,
            driver_license_class: None,
            driver_license_expiry: None,
            active: true,
        }
    }

    #[tokio::test]
    async fn test_list_employees_filters() {
        let test_db = TestDbBuilder::new()
            .employee("VL-001", "Ana Machava", "Vale")
            .employee("VL-002", "Bernardo Cossa", "Vale")
            .employee("CA-001", "Daniel Sitoe", "Contractor A")
            .inactive_employee("VL-003", "Old Timer", "Vale")
            .build()
            .await
            .expect("Failed to build test database");

        let all = list_employees(&test_db.pool, &EmployeeFilter::default())
            .await
            .expect("Failed to list employees");
        assert_eq!(all.len(), 3, "Inactive employees are hidden by default");

        let vale = list_employees(
            &test_db.pool,
            &EmployeeFilter {
                company: Some("Vale".to_string()),
                include_inactive: true,
                ..EmployeeFilter::default()
            },
        )
        .await
        .expect("Failed to list employees");
        assert_eq!(vale.len(), 3);
        assert!(vale.iter().all(|e| e.company == "Vale"));

        let search = list_employees(
            &test_db.pool,
            &EmployeeFilter {
                search: Some("ca-0".to_string()),
                ..EmployeeFilter::default()
            },
        )
        .await
        .expect("Failed to search employees");
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].name, "Daniel Sitoe");
    }

    #[tokio::test]
    async fn test_record_id_must_be_unique() {
        let test_db = TestDbBuilder::new()
            .employee("VL-001", "Ana Machava", "Vale")
            .employee("VL-002", "Bernardo Cossa", "Vale")
            .build()
            .await
            .expect("Failed to build test database");

        let duplicate = create_employee(&test_db.pool, &input("VL-001", "Someone", "Vale")).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));

        let id = test_db.employee_id("VL-002").expect("Employee not found");
        let clash = update_employee(&test_db.pool, id, &input("VL-001", "Bernardo", "Vale")).await;
        assert!(matches!(clash, Err(AppError::Conflict(_))));

        update_employee(&test_db.pool, id, &input("VL-002", "Bernardo C.", "Vale"))
            .await
            .expect("Keeping the same record id should succeed");

        let employee = get_employee(&test_db.pool, id)
            .await
            .expect("Failed to load employee");
        assert_eq!(employee.name, "Bernardo C.");
    }

    #[tokio::test]
    async fn test_unique_index_violation_is_a_conflict() {
        let test_db = TestDbBuilder::new()
            .employee("VL-001", "Ana Machava", "Vale")
            .build()
            .await
            .expect("Failed to build test database");

        // Skips the record id pre-check, as a concurrent request would.
        let err = sqlx::query("INSERT INTO employees (record_id, name, company) VALUES (?, ?, ?)")
            .bind("VL-001")
            .bind("Someone Else")
            .bind("Vale")
            .execute(&test_db.pool)
            .await
            .expect_err("Duplicate record id should hit the unique index");

        match unique_conflict(err, || "taken".to_string()) {
            AppError::Conflict(msg) => assert_eq!(msg, "taken"),
            other => panic!("Expected a conflict, got {:?}", other),
        }

        let other = sqlx::query("SELECT * FROM no_such_table")
            .execute(&test_db.pool)
            .await
            .expect_err("Missing table should fail");
        assert!(matches!(
            unique_conflict(other, || "taken".to_string()),
            AppError::Database(_)
        ));
    }

    #[tokio::test]
    async fn test_requirements_default_and_replace() {
        let test_db = TestDbBuilder::new()
            .employee("VL-001", "Ana Machava", "Vale")
            .build()
            .await
            .expect("Failed to build test database");

        let id = test_db.employee_id("VL-001").expect("Employee not found");

        let empty = get_employee_requirement(&test_db.pool, id)
            .await
            .expect("Failed to load requirement");
        assert!(empty.required_racs.is_empty());
        assert_eq!(empty.aso_expiry, None);

        let aso = days_from_today(90);
        set_employee_requirement(&test_db.pool, id, &[RacType::Rac03, RacType::Rac01], Some(aso))
            .await
            .expect("Failed to set requirement");
        set_employee_requirement(&test_db.pool, id, &[RacType::Rac02, RacType::Rac01], Some(aso))
            .await
            .expect("Failed to replace requirement");

        let requirement = get_employee_requirement(&test_db.pool, id)
            .await
            .expect("Failed to load requirement");
        assert_eq!(requirement.required_racs, vec![RacType::Rac01, RacType::Rac02]);
        assert_eq!(requirement.aso_expiry, Some(aso));

        let all = get_all_requirements(&test_db.pool)
            .await
            .expect("Failed to load requirements");
        assert_eq!(all.get(&id), Some(&requirement));

        let missing = set_employee_requirement(&test_db.pool, 9999, &[RacType::Rac01], None).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_employee_cascades() {
        let test_db = create_standard_test_db().await;
        let id = test_db.employee_id("VL-001").expect("Employee not found");

        delete_employee(&test_db.pool, id)
            .await
            .expect("Failed to delete employee");

        assert!(matches!(
            get_employee(&test_db.pool, id).await,
            Err(AppError::NotFound(_))
        ));

        let bookings = list_bookings(
            &test_db.pool,
            &BookingFilter {
                employee_id: Some(id),
                ..BookingFilter::default()
            },
        )
        .await
        .expect("Failed to list bookings");
        assert!(bookings.is_empty());

        let requirement = get_employee_requirement(&test_db.pool, id)
            .await
            .expect("Failed to load requirement");
        assert!(requirement.required_racs.is_empty());

        assert!(matches!(
            delete_employee(&test_db.pool, id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
