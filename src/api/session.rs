use crate::auth::principal::Principal;
use crate::model::role::Capability;
use crate::model::session::AttendanceSession;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateSession {
    #[schema(example = "Morning roll call")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "2026-01-15T08:00:00", format = "date-time", value_type = String)]
    pub start_time: NaiveDateTime,
    #[schema(example = "2026-01-15T10:00:00", format = "date-time", value_type = String)]
    pub end_time: NaiveDateTime,
    pub location: Option<String>,
}

/// List attendance sessions
#[utoipa::path(
    get,
    path = "/api/v1/sessions",
    responses(
        (status = 200, description = "Sessions with derived is_ongoing flag", body = Object)
    ),
    tag = "Calendar"
)]
pub async fn list_sessions(
    _principal: Principal,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let sessions = sqlx::query_as::<_, AttendanceSession>(
        "SELECT * FROM attendance_sessions ORDER BY start_time DESC",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch sessions");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let now = Utc::now().naive_utc();
    let body: Vec<Value> = sessions
        .iter()
        .map(|session| with_ongoing(session, now))
        .collect::<Result<_, _>>()?;

    Ok(HttpResponse::Ok().json(body))
}

/// Get one session
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{session_id}",
    params(("session_id", Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session found", body = Object),
        (status = 404, description = "Session not found")
    ),
    tag = "Calendar"
)]
pub async fn get_session(
    _principal: Principal,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let session_id = path.into_inner();
    let session = sqlx::query_as::<_, AttendanceSession>(
        "SELECT * FROM attendance_sessions WHERE id = ?",
    )
    .bind(session_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, session_id, "Failed to fetch session");
        ErrorInternalServerError("Internal Server Error")
    })?;

    match session {
        Some(session) => Ok(HttpResponse::Ok().json(with_ongoing(&session, Utc::now().naive_utc())?)),
        None => Ok(HttpResponse::NotFound().json(json!({"error": "Session not found"}))),
    }
}

/// Create a session (admin)
#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    request_body = CreateSession,
    responses(
        (status = 201, description = "Session created"),
        (status = 400, description = "end_time not after start_time"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Calendar"
)]
pub async fn create_session(
    principal: Principal,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateSession>,
) -> actix_web::Result<impl Responder> {
    principal.require(Capability::ManageCalendar)?;

    if payload.end_time <= payload.start_time {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "end_time must be after start_time"
        })));
    }

    sqlx::query(
        r#"
        INSERT INTO attendance_sessions
            (name, description, start_time, end_time, created_by, location)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.start_time)
    .bind(payload.end_time)
    .bind(principal.user_id)
    .bind(&payload.location)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create session");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(json!({"message": "Session created"})))
}

fn with_ongoing(
    session: &AttendanceSession,
    now: NaiveDateTime,
) -> actix_web::Result<Value> {
    let mut body = serde_json::to_value(session).map_err(|e| {
        error!(error = %e, "Failed to serialize session");
        ErrorInternalServerError("Internal Server Error")
    })?;
    body["is_ongoing"] = json!(session.is_ongoing(now));
    Ok(body)
}
