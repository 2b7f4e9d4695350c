#[cfg(test)]
mod tests {
    use crate::api::today;
    use crate::auth::Role;
    use crate::config::Settings;
    use crate::db::{
        BookingFilter, EmployeeFilter, authenticate_user, count_users, list_bookings,
        list_employees, list_training_sessions,
    };
    use crate::models::BookingStatus;
    use crate::planning::compliance_snapshot;
    use crate::seed::{bootstrap_admin, seed_demo_data};
    use crate::test::test_utils::TestDbBuilder;
    use rocket::tokio;

    #[tokio::test]
    async fn test_bootstrap_admin_only_on_empty_table() {
        let test_db = TestDbBuilder::new()
            .build()
            .await
            .expect("Failed to build test database");

        let unconfigured = bootstrap_admin(&test_db.pool, &Settings::default())
            .await
            .expect("Bootstrap failed");
        assert_eq!(unconfigured, None, "No password means no admin");

        let settings = Settings {
            admin_username: "root_admin".to_string(),
            admin_company: "Contractor A".to_string(),
            admin_password: Some("bootstrap-secret".to_string()),
            ..Settings::default()
        };

        let created = bootstrap_admin(&test_db.pool, &settings)
            .await
            .expect("Bootstrap failed");
        assert!(created.is_some());

        let admin = authenticate_user(&test_db.pool, "root_admin", "bootstrap-secret")
            .await
            .expect("Authentication query failed")
            .expect("Admin should log in");
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.company, "Contractor A");

        let again = bootstrap_admin(&test_db.pool, &settings)
            .await
            .expect("Bootstrap failed");
        assert_eq!(again, None);
        assert_eq!(count_users(&test_db.pool).await.expect("Count failed"), 1);
    }

    #[tokio::test]
    async fn test_seed_demo_data_once() {
        let test_db = TestDbBuilder::new()
            .build()
            .await
            .expect("Failed to build test database");
        let settings = Settings::default();

        let seeded = seed_demo_data(&test_db.pool, &settings, today())
            .await
            .expect("Seeding failed");
        assert!(seeded);

        let employees = list_employees(&test_db.pool, &EmployeeFilter::default())
            .await
            .expect("Failed to list employees");
        assert_eq!(employees.len(), 6);

        let upcoming = list_training_sessions(&test_db.pool, None, Some(today()))
            .await
            .expect("Failed to list sessions");
        assert_eq!(upcoming.len(), 5);

        let passed = list_bookings(
            &test_db.pool,
            &BookingFilter {
                status: Some(BookingStatus::Passed),
                ..BookingFilter::default()
            },
        )
        .await
        .expect("Failed to list bookings");
        assert_eq!(passed.len(), 7);

        let snapshot = compliance_snapshot(&test_db.pool, &settings, today(), None)
            .await
            .expect("Failed to build snapshot");
        assert_eq!(snapshot.len(), 6);
        assert!(snapshot.iter().any(|c| !c.compliant));

        let second = seed_demo_data(&test_db.pool, &settings, today())
            .await
            .expect("Seeding failed");
        assert!(!second, "Existing employees are left alone");
    }
}
