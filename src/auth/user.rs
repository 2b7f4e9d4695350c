use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use rand::distr::Alphanumeric;
use rocket::http::Status;
use serde::Serialize;

use super::{Permission, Role};

#[derive(Debug, Serialize, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub company: String,
    pub archived: bool,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbUser {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<String>,
    pub company: Option<String>,
    pub archived: Option<bool>,
}

impl From<DbUser> for User {
    fn from(user: DbUser) -> Self {
        let role = user.role.unwrap_or_default();
        Self {
            id: user.id.unwrap_or_default(),
            username: user.username.unwrap_or_default(),
            display_name: user.display_name.unwrap_or_default(),
            role: Role::from_str(&role).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to viewer role");
                Role::Viewer
            }),
            company: user.company.unwrap_or_default(),
            archived: user.archived.unwrap_or_default(),
        }
    }
}

impl User {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.has_permission(permission)
    }

    pub fn require_permission(&self, permission: Permission) -> Result<(), Status> {
        if self.role.has_permission(permission) {
            Ok(())
        } else {
            tracing::warn!(
                username = %self.username,
                role = %self.role.as_str(),
                permission = ?permission,
                "Permission denied"
            );
            Err(Status::Forbidden)
        }
    }

    pub fn require_all_permissions(&self, permissions: &[Permission]) -> Result<(), Status> {
        if permissions.iter().all(|p| self.role.has_permission(*p)) {
            Ok(())
        } else {
            tracing::warn!(
                username = %self.username,
                role = %self.role.as_str(),
                permissions = ?permissions,
                "Permission denied (require all)"
            );
            Err(Status::Forbidden)
        }
    }

    /// The company this user is restricted to, or `None` when they may see
    /// every company's workforce.
    pub fn company_scope(&self) -> Option<&str> {
        if self.has_permission(Permission::ViewAllCompanies) {
            None
        } else {
            Some(self.company.as_str())
        }
    }

    pub fn can_access_company(&self, company: &str) -> bool {
        match self.company_scope() {
            None => true,
            Some(own) => own == company,
        }
    }

    pub fn require_company(&self, company: &str) -> Result<(), Status> {
        if self.can_access_company(company) {
            Ok(())
        } else {
            tracing::warn!(
                username = %self.username,
                user_company = %self.company,
                company = %company,
                "Company access denied"
            );
            Err(Status::Forbidden)
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserSession {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub created_at: NaiveDateTime,
    pub last_activity: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbUserSession {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub token: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub last_activity: Option<NaiveDateTime>,
    pub expires_at: Option<NaiveDateTime>,
}

impl From<DbUserSession> for UserSession {
    fn from(session: DbUserSession) -> Self {
        let created_at = session.created_at.unwrap_or_default();
        Self {
            id: session.id.unwrap_or_default(),
            user_id: session.user_id.unwrap_or_default(),
            token: session.token.unwrap_or_default(),
            created_at,
            last_activity: session.last_activity.unwrap_or(created_at),
            expires_at: session.expires_at.unwrap_or_default(),
        }
    }
}

impl UserSession {
    pub fn generate_token() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(48)
            .map(char::from)
            .collect()
    }

    /// A session dies at its absolute expiry or after `idle_timeout` without
    /// an authenticated request, whichever comes first.
    pub fn is_valid(&self, now: NaiveDateTime, idle_timeout: Duration) -> bool {
        now < self.expires_at && now - self.last_activity <= idle_timeout
    }
}
