use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::Deserialize;
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{Permission, Role, User};
use crate::db::{
    create_user, find_user_by_username, get_all_users, set_user_archived,
    update_user_company, update_user_display_name, update_user_password, update_user_role,
};
use crate::validation::{
    ApiError, AppErrorExt, JsonValidateExt, PermissionCheckExt, ValidationResponse,
};

use super::UserData;

fn parse_role(role: &str) -> Result<Role, ApiError> {
    Role::from_str(role).map_err(|e| {
        Custom(
            Status::UnprocessableEntity,
            Json(ValidationResponse::with_error("role", &e.to_string())),
        )
    })
}

#[get("/admin/users")]
pub async fn api_get_all_users(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<UserData>>, Status> {
    user.require_permission(Permission::ManageUsers)?;

    let users = get_all_users(db).await?;

    Ok(Json(users.into_iter().map(UserData::from).collect()))
}

#[derive(Deserialize, Validate, Clone)]
pub struct UserRegistrationRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be 3-50 characters"))]
    username: String,
    #[validate(length(min = 1, max = 100, message = "Display name must be 1-100 characters"))]
    display_name: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    password: String,
    role: String,
    #[validate(length(min = 1, max = 100, message = "Company is required"))]
    company: String,
}

#[post("/admin/users", data = "<registration>")]
pub async fn api_register_user(
    registration: Json<UserRegistrationRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, ApiError> {
    user.require_permission(Permission::ManageUsers)
        .validate_custom()?;
    let validated = registration.validate_custom()?;
    let role = parse_role(&validated.role)?;

    let existing_user = find_user_by_username(db, &validated.username)
        .await
        .validate_custom()?;

    if existing_user.is_some() {
        return Err(Custom(
            Status::Conflict,
            Json(ValidationResponse::with_error(
                "username",
                "Username already exists",
            )),
        ));
    }

    create_user(
        db,
        &validated.username,
        &validated.password,
        role,
        &validated.display_name,
        &validated.company,
    )
    .await
    .validate_custom()?;

    Ok(Status::Created)
}

#[derive(Deserialize, Validate)]
pub struct UserUpdateRequest {
    #[validate(length(min = 1, max = 100, message = "Display name must be 1-100 characters"))]
    display_name: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    password: Option<String>,
    role: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Company is required"))]
    company: Option<String>,
    archived: Option<bool>,
}

#[put("/admin/users/<id>", data = "<update>")]
pub async fn api_update_user(
    id: i64,
    update: Json<UserUpdateRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, ApiError> {
    user.require_permission(Permission::ManageUsers)
        .validate_custom()?;
    let update = update.validate_custom()?;

    let role = update.role.as_deref().map(parse_role).transpose()?;

    if id == user.id && (update.archived == Some(true) || role.is_some_and(|r| r != user.role)) {
        return Err(Custom(
            Status::UnprocessableEntity,
            Json(ValidationResponse::with_error(
                "user",
                "You cannot archive yourself or change your own role",
            )),
        ));
    }

    if let Some(display_name) = &update.display_name {
        update_user_display_name(db, id, display_name)
            .await
            .validate_custom()?;
    }

    if let Some(password) = &update.password {
        update_user_password(db, id, password)
            .await
            .validate_custom()?;
    }

    if let Some(role) = role {
        update_user_role(db, id, role).await.validate_custom()?;
    }

    if let Some(company) = &update.company {
        update_user_company(db, id, company)
            .await
            .validate_custom()?;
    }

    if let Some(archived) = update.archived {
        set_user_archived(db, id, archived)
            .await
            .validate_custom()?;
    }

    Ok(Status::Ok)
}
