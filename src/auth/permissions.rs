use anyhow::Error;
use once_cell::sync::Lazy;
use rocket::serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ViewOwnProfile,
    EditOwnProfile,
    ViewEmployees,
    ViewSessions,
    ViewBookings,
    ViewReports,

    RecordResults,

    ManageEmployees,
    ManageSessions,
    ManageBookings,
    ApproveBookings,
    ManageNotifications,

    ManageUsers,
    ViewAllCompanies,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Trainer,
    Manager,
    Admin,
}

static VIEWER_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.insert(Permission::ViewOwnProfile);
    permissions.insert(Permission::EditOwnProfile);
    permissions.insert(Permission::ViewEmployees);
    permissions.insert(Permission::ViewSessions);
    permissions.insert(Permission::ViewBookings);
    permissions.insert(Permission::ViewReports);

    permissions
});

static TRAINER_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(VIEWER_PERMISSIONS.iter().copied());

    permissions.insert(Permission::RecordResults);

    permissions
});

static MANAGER_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(TRAINER_PERMISSIONS.iter().copied());

    permissions.insert(Permission::ManageEmployees);
    permissions.insert(Permission::ManageSessions);
    permissions.insert(Permission::ManageBookings);
    permissions.insert(Permission::ApproveBookings);
    permissions.insert(Permission::ManageNotifications);

    permissions
});

static ADMIN_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(MANAGER_PERMISSIONS.iter().copied());

    permissions.insert(Permission::ManageUsers);
    permissions.insert(Permission::ViewAllCompanies);

    permissions
});

impl Role {
    pub fn permissions(&self) -> &'static HashSet<Permission> {
        match self {
            Role::Viewer => &VIEWER_PERMISSIONS,
            Role::Trainer => &TRAINER_PERMISSIONS,
            Role::Manager => &MANAGER_PERMISSIONS,
            Role::Admin => &ADMIN_PERMISSIONS,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Trainer => "trainer",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "viewer" => Ok(Role::Viewer),
            "trainer" => Ok(Role::Trainer),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            _ => Err(Error::msg(format!("Unknown role: {}", s))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
