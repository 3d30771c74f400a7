use crate::auth::principal::Principal;
use crate::model::role::{Capability, Role};
use crate::model::user::User;
use crate::utils::db_utils::{build_update_sql, execute_update};
use crate::utils::username_filter;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "jane@school.edu", format = "email", value_type = String)]
    pub email: String,
    #[schema(example = "Jane")]
    pub first_name: String,
    pub last_name: Option<String>,
    #[schema(example = "student")]
    pub user_type: Role,
    pub phone_number: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct UserQuery {
    pub user_type: Option<String>,
    pub department: Option<String>,
    /// Search by name, username, or email
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(serde::Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<User>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Create a user
///
/// Open endpoint so enrollment kiosks can self-register students; the
/// student/employee code is generated when not supplied.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = Object, example = json!({
            "message": "User created successfully",
            "student_id": "STU0042"
        })),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Username already taken"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Users"
)]
pub async fn create_user(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUser>,
) -> actix_web::Result<impl Responder> {
    let username = payload.username.trim();
    if username.is_empty() || payload.email.trim().is_empty() || payload.first_name.trim().is_empty()
    {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "username, email, and first_name are required"
        })));
    }

    if !username_filter::is_available(username, pool.get_ref()).await {
        return Ok(HttpResponse::Conflict().json(json!({
            "error": "Username already taken"
        })));
    }

    let code = next_code(pool.get_ref(), payload.user_type)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to generate user code");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let (employee_id, student_id) = match payload.user_type {
        Role::Employee => (code.clone(), None),
        Role::Student => (None, code.clone()),
        Role::Admin => (None, None),
    };

    let result = sqlx::query(
        r#"
        INSERT INTO users
            (username, first_name, last_name, email, user_type,
             employee_id, student_id, phone_number, department)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(username)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.email)
    .bind(payload.user_type.as_ref())
    .bind(&employee_id)
    .bind(&student_id)
    .bind(&payload.phone_number)
    .bind(&payload.department)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => {
            username_filter::insert(username);

            let mut body = json!({"message": "User created successfully"});
            if let Some(employee_id) = employee_id {
                body["employee_id"] = json!(employee_id);
            }
            if let Some(student_id) = student_id {
                body["student_id"] = json!(student_id);
            }
            Ok(HttpResponse::Created().json(body))
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "error": "Username already taken"
                    })));
                }
            }
            error!(error = %e, "Failed to create user");
            Err(ErrorInternalServerError("Internal Server Error"))
        }
    }
}

/// List users (admin)
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserQuery),
    responses(
        (status = 200, description = "Paginated user list", body = UserListResponse),
        (status = 403, description = "Forbidden")
    ),
    tag = "Users"
)]
pub async fn list_users(
    principal: Principal,
    pool: web::Data<MySqlPool>,
    query: web::Query<UserQuery>,
) -> actix_web::Result<impl Responder> {
    principal.require(Capability::ManageUsers)?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut conditions = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if let Some(user_type) = &query.user_type {
        conditions.push("user_type = ?");
        bindings.push(user_type.to_lowercase());
    }
    if let Some(department) = &query.department {
        conditions.push("department = ?");
        bindings.push(department.clone());
    }
    if let Some(search) = &query.search {
        conditions.push("(username LIKE ? OR first_name LIKE ? OR last_name LIKE ? OR email LIKE ?)");
        let like = format!("%{}%", search);
        for _ in 0..4 {
            bindings.push(like.clone());
        }
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM users {}", where_clause);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for binding in &bindings {
        count_query = count_query.bind(binding.clone());
    }
    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count users");
        ErrorInternalServerError("Database error")
    })?;

    let data_sql = format!(
        "SELECT * FROM users {} ORDER BY created_at DESC LIMIT ? OFFSET ?",
        where_clause
    );
    let mut data_query = sqlx::query_as::<_, User>(&data_sql);
    for binding in &bindings {
        data_query = data_query.bind(binding.clone());
    }
    let users = data_query
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch users");
            ErrorInternalServerError("Database error")
        })?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        data: users,
        page,
        per_page,
        total,
    }))
}

/// Current caller's profile
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Caller profile", body = User),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn me(
    principal: Principal,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    fetch_user_response(pool.get_ref(), principal.user_id).await
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    params(("user_id", Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn get_user(
    principal: Principal,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let user_id = path.into_inner();
    principal.require_self_or(user_id, Capability::ManageUsers)?;
    fetch_user_response(pool.get_ref(), user_id).await
}

/// Update a user
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    params(("user_id", Path, description = "User ID")),
    request_body = Object,
    responses(
        (status = 200, description = "User updated"),
        (status = 400, description = "Bad payload"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn update_user(
    principal: Principal,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let user_id = path.into_inner();
    principal.require_self_or(user_id, Capability::ManageUsers)?;

    // Role and activation changes stay admin-only even on your own row.
    if body.get("user_type").is_some() || body.get("is_active").is_some() {
        principal.require(Capability::ManageUsers)?;
    }
    if let Some(user_type) = body.get("user_type").and_then(Value::as_str) {
        if user_type.parse::<Role>().is_err() {
            return Ok(HttpResponse::BadRequest().json(json!({
                "error": "Invalid user_type. Allowed: student, employee, admin"
            })));
        }
    }

    let update = build_update_sql(
        "users",
        &body,
        &[
            "first_name",
            "last_name",
            "email",
            "phone_number",
            "department",
            "user_type",
            "is_active",
        ],
        "id",
        user_id,
    )?;

    let affected = execute_update(pool.get_ref(), update).await.map_err(|e| {
        error!(error = %e, user_id, "Failed to update user");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({"error": "User not found"})));
    }

    Ok(HttpResponse::Ok().json(json!({"message": "User updated successfully"})))
}

/// Delete a user (admin)
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    params(("user_id", Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn delete_user(
    principal: Principal,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    principal.require(Capability::ManageUsers)?;

    let user_id = path.into_inner();
    let username: Option<String> = sqlx::query_scalar("SELECT username FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to fetch user for deletion");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let username = match username {
        Some(name) => name,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({"error": "User not found"})));
        }
    };

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to delete user");
            ErrorInternalServerError("Internal Server Error")
        })?;

    username_filter::remove(&username);

    Ok(HttpResponse::Ok().json(json!({"message": "User deleted successfully"})))
}

async fn fetch_user_response(pool: &MySqlPool, user_id: u64) -> actix_web::Result<HttpResponse> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to fetch user");
            ErrorInternalServerError("Internal Server Error")
        })?;

    match user {
        Some(user) => Ok(HttpResponse::Ok().json(user)),
        None => Ok(HttpResponse::NotFound().json(json!({"error": "User not found"}))),
    }
}

/// Next sequential STU/EMP code, following whatever the highest existing
/// code is. Admins carry no code.
async fn next_code(pool: &MySqlPool, role: Role) -> Result<Option<String>, sqlx::Error> {
    let (column, prefix) = match role {
        Role::Student => ("student_id", "STU"),
        Role::Employee => ("employee_id", "EMP"),
        Role::Admin => return Ok(None),
    };

    let last: Option<String> = sqlx::query_scalar(&format!(
        "SELECT {column} FROM users WHERE user_type = ? AND {column} IS NOT NULL ORDER BY id DESC LIMIT 1"
    ))
    .bind(role.as_ref())
    .fetch_optional(pool)
    .await?;

    let next = last
        .as_deref()
        .and_then(|code| code.strip_prefix(prefix))
        .and_then(|digits| digits.parse::<u32>().ok())
        .map(|n| n + 1)
        .unwrap_or(1);

    Ok(Some(format!("{prefix}{next:04}")))
}
