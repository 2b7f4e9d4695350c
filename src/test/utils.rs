#[cfg(test)]
pub mod test_utils {
    use crate::api::{LoginResponse, today};
    use crate::auth::Role;
    use crate::config::Settings;
    use crate::db::{
        EmployeeInput, ResultInput, TrainingSessionInput, book_employee, create_employee,
        create_training_session, create_user, record_booking_results, set_employee_requirement,
    };
    use crate::error::AppError;
    use crate::init_rocket;
    use crate::models::RacType;
    use chrono::{Duration, Months, NaiveDate};
    use rocket::http::{ContentType, Cookie, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::json;
    use sqlx::{Pool, Sqlite, SqlitePool};
    use std::collections::HashMap;
    use std::sync::Once;
    use tracing_subscriber::EnvFilter;

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";

    #[derive(Default)]
    pub struct TestDbBuilder {
        users: Vec<TestUser>,
        employees: Vec<TestEmployee>,
        requirements: Vec<TestRequirement>,
        sessions: Vec<TestSession>,
        bookings: Vec<TestBooking>,
        certificates: Vec<TestCertificate>,
    }

    pub struct TestUser {
        pub username: String,
        pub role: Role,
        pub company: String,
        pub password: String,
    }

    pub struct TestEmployee {
        pub record_id: String,
        pub name: String,
        pub company: String,
        pub license_expiry: Option<NaiveDate>,
        pub active: bool,
    }

    pub struct TestRequirement {
        pub record_id: String,
        pub racs: Vec<RacType>,
        pub aso_expiry: Option<NaiveDate>,
    }

    pub struct TestSession {
        pub key: String,
        pub rac_type: RacType,
        pub session_date: NaiveDate,
        pub capacity: i64,
    }

    pub struct TestBooking {
        pub record_id: String,
        pub session_key: String,
    }

    pub struct TestCertificate {
        pub record_id: String,
        pub rac_type: RacType,
        pub expiry_date: NaiveDate,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn user(self, username: &str, role: Role, company: &str) -> Self {
            self.user_with_password(username, role, company, STANDARD_PASSWORD)
        }

        pub fn viewer(self, username: &str, company: &str) -> Self {
            self.user(username, Role::Viewer, company)
        }

        pub fn trainer(self, username: &str, company: &str) -> Self {
            self.user(username, Role::Trainer, company)
        }

        pub fn manager(self, username: &str, company: &str) -> Self {
            self.user(username, Role::Manager, company)
        }

        pub fn admin(self, username: &str, company: &str) -> Self {
            self.user(username, Role::Admin, company)
        }

        pub fn user_with_password(
            mut self,
            username: &str,
            role: Role,
            company: &str,
            password: &str,
        ) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                role,
                company: company.to_string(),
                password: password.to_string(),
            });
            self
        }

        pub fn employee(mut self, record_id: &str, name: &str, company: &str) -> Self {
            self.employees.push(TestEmployee {
                record_id: record_id.to_string(),
                name: name.to_string(),
                company: company.to_string(),
                license_expiry: None,
                active: true,
            });
            self
        }

        pub fn licensed_employee(
            mut self,
            record_id: &str,
            name: &str,
            company: &str,
            license_expiry: NaiveDate,
        ) -> Self {
            self.employees.push(TestEmployee {
                record_id: record_id.to_string(),
                name: name.to_string(),
                company: company.to_string(),
                license_expiry: Some(license_expiry),
                active: true,
            });
            self
        }

        pub fn inactive_employee(mut self, record_id: &str, name: &str, company: &str) -> Self {
            self.employees.push(TestEmployee {
                record_id: record_id.to_string(),
                name: name.to_string(),
                company: company.to_string(),
                license_expiry: None,
                active: false,
            });
            self
        }

        pub fn requirement(
            mut self,
            record_id: &str,
            racs: &[RacType],
            aso_expiry: Option<NaiveDate>,
        ) -> Self {
            self.requirements.push(TestRequirement {
                record_id: record_id.to_string(),
                racs: racs.to_vec(),
                aso_expiry,
            });
            self
        }

        pub fn session(
            mut self,
            key: &str,
            rac_type: RacType,
            session_date: NaiveDate,
            capacity: i64,
        ) -> Self {
            self.sessions.push(TestSession {
                key: key.to_string(),
                rac_type,
                session_date,
                capacity,
            });
            self
        }

        pub fn booking(mut self, record_id: &str, session_key: &str) -> Self {
            self.bookings.push(TestBooking {
                record_id: record_id.to_string(),
                session_key: session_key.to_string(),
            });
            self
        }

        /// A passed result whose certificate expires on `expiry_date`.
        pub fn certificate(
            mut self,
            record_id: &str,
            rac_type: RacType,
            expiry_date: NaiveDate,
        ) -> Self {
            self.certificates.push(TestCertificate {
                record_id: record_id.to_string(),
                rac_type,
                expiry_date,
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(EnvFilter::new("debug"))
                    .with_test_writer()
                    .try_init();
            });

            let settings = Settings::default();
            let pool = SqlitePool::connect("sqlite::memory:").await?;

            sqlx::migrate!("./migrations").run(&pool).await?;

            let mut user_id_map: HashMap<String, i64> = HashMap::new();
            let mut employee_id_map: HashMap<String, i64> = HashMap::new();
            let mut session_id_map: HashMap<String, i64> = HashMap::new();

            for user in &self.users {
                let user_id = create_user(
                    &pool,
                    &user.username,
                    &user.password,
                    user.role,
                    &user.username,
                    &user.company,
                )
                .await?;

                user_id_map.insert(user.username.clone(), user_id);
            }

            for employee in &self.employees {
                let employee_id = create_employee(
                    &pool,
                    &EmployeeInput {
                        record_id: employee.record_id.clone(),
                        name: employee.name.clone(),
                        company: employee.company.clone(),
                        department: "Operations".to_string(),
                        job_title: "Operator".to_string(),
                        driver_license_number: employee
                            .license_expiry
                            .map(|_| format!("DL-{}", employee.record_id)),
                        driver_license_class: employee.license_expiry.map(|_| "C".to_string()),
                        driver_license_expiry: employee.license_expiry,
                        active: employee.active,
                    },
                )
                .await?;

                employee_id_map.insert(employee.record_id.clone(), employee_id);
            }

            for requirement in &self.requirements {
                if let Some(employee_id) = employee_id_map.get(&requirement.record_id) {
                    set_employee_requirement(
                        &pool,
                        *employee_id,
                        &requirement.racs,
                        requirement.aso_expiry,
                    )
                    .await?;
                }
            }

            for session in &self.sessions {
                let session_id = create_training_session(
                    &pool,
                    &TrainingSessionInput {
                        rac_type: session.rac_type,
                        session_date: session.session_date,
                        capacity: session.capacity,
                        location: "Training Center".to_string(),
                        instructor: "Instructor".to_string(),
                    },
                )
                .await?;

                session_id_map.insert(session.key.clone(), session_id);
            }

            for booking in &self.bookings {
                let (Some(employee_id), Some(session)) = (
                    employee_id_map.get(&booking.record_id),
                    self.sessions.iter().find(|s| s.key == booking.session_key),
                ) else {
                    continue;
                };

                book_employee(
                    &pool,
                    session_id_map[&session.key],
                    *employee_id,
                    session.session_date.min(today()),
                )
                .await?;
            }

            for certificate in &self.certificates {
                let Some(employee_id) = employee_id_map.get(&certificate.record_id) else {
                    continue;
                };

                let result_date = certificate
                    .expiry_date
                    .checked_sub_months(Months::new(settings.certificate_validity_months))
                    .unwrap_or(certificate.expiry_date);

                let session_id = create_training_session(
                    &pool,
                    &TrainingSessionInput {
                        rac_type: certificate.rac_type,
                        session_date: result_date,
                        capacity: 20,
                        location: "Training Center".to_string(),
                        instructor: "Instructor".to_string(),
                    },
                )
                .await?;

                let booking_id = book_employee(&pool, session_id, *employee_id, result_date).await?;

                record_booking_results(
                    &pool,
                    booking_id,
                    &ResultInput {
                        theory_score: 90,
                        practical_score: certificate.rac_type.requires_practical().then_some(90),
                        result_date: None,
                    },
                    settings.pass_mark,
                    settings.certificate_validity_months,
                )
                .await?;
            }

            Ok(TestDb {
                pool,
                user_id_map,
                employee_id_map,
                session_id_map,
            })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub user_id_map: HashMap<String, i64>,
        pub employee_id_map: HashMap<String, i64>,
        pub session_id_map: HashMap<String, i64>,
    }

    impl TestDb {
        pub fn user_id(&self, username: &str) -> Option<i64> {
            self.user_id_map.get(username).copied()
        }

        pub fn employee_id(&self, record_id: &str) -> Option<i64> {
            self.employee_id_map.get(record_id).copied()
        }

        pub fn session_id(&self, key: &str) -> Option<i64> {
            self.session_id_map.get(key).copied()
        }

        pub async fn booking_id(&self, record_id: &str, session_key: &str) -> Result<i64, sqlx::Error> {
            let employee_id = self
                .employee_id(record_id)
                .ok_or_else(|| sqlx::Error::RowNotFound)?;

            let session_id = self
                .session_id(session_key)
                .ok_or_else(|| sqlx::Error::RowNotFound)?;

            let (id,): (i64,) = sqlx::query_as(
                "SELECT id FROM bookings
                 WHERE employee_id = ? AND session_id = ? AND status != 'cancelled'",
            )
            .bind(employee_id)
            .bind(session_id)
            .fetch_one(&self.pool)
            .await?;

            Ok(id)
        }
    }

    pub fn days_from_today(days: i64) -> NaiveDate {
        today() + Duration::days(days)
    }

    /// Two companies, one user per role, three employees and two upcoming
    /// sessions. Only VL-001 holds a certificate (RAC01).
    pub async fn create_standard_test_db() -> TestDb {
        TestDbBuilder::new()
            .admin("admin_user", "Vale")
            .manager("manager_user", "Vale")
            .trainer("trainer_user", "Vale")
            .viewer("viewer_user", "Vale")
            .manager("contractor_manager", "Contractor A")
            .licensed_employee("VL-001", "Ana Machava", "Vale", days_from_today(400))
            .employee("VL-002", "Bernardo Cossa", "Vale")
            .employee("CA-001", "Daniel Sitoe", "Contractor A")
            .requirement(
                "VL-001",
                &[RacType::Rac01, RacType::Rac02],
                Some(days_from_today(200)),
            )
            .requirement("VL-002", &[RacType::Rac01], Some(days_from_today(200)))
            .requirement("CA-001", &[RacType::Rac01], Some(days_from_today(200)))
            .session("rac01-next", RacType::Rac01, days_from_today(7), 2)
            .session("rac02-next", RacType::Rac02, days_from_today(10), 1)
            .certificate("VL-001", RacType::Rac01, days_from_today(300))
            .build()
            .await
            .expect("Failed to build standard test database")
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
        setup_test_client_with_settings(test_db, Settings::default()).await
    }

    pub async fn setup_test_client_with_settings(
        test_db: TestDb,
        settings: Settings,
    ) -> (Client, TestDb) {
        let rocket = init_rocket(test_db.pool.clone(), settings).await;
        let client = Client::untracked(rocket)
            .await
            .expect("Failed to build Rocket client");

        (client, test_db)
    }

    pub async fn login_test_user(
        client: &Client,
        username: &str,
        password: &str,
    ) -> Vec<Cookie<'static>> {
        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(
                json!({
                    "username": username,
                    "password": password
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);

        let cookies: Vec<Cookie<'static>> = response
            .cookies()
            .iter()
            .map(|cookie| cookie.clone().into_owned())
            .collect();

        let body = response.into_string().await.expect("Login response body");
        let login: LoginResponse = serde_json::from_str(&body).expect("Login response JSON");
        assert!(login.success, "Login failed for {}", username);

        cookies
    }
}
