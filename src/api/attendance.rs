use crate::attendance::{self, MarkAction, MarkError, Provenance, state};
use crate::auth::principal::Principal;
use crate::config::Config;
use crate::events::{AttendanceEvent, EventBus};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::role::Capability;
use crate::utils::db_utils::{build_update_sql, execute_update, parse_datetime};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckInRequest {
    #[schema(example = "Main gate")]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RecordQuery {
    /// Inclusive range start (YYYY-MM-DD)
    #[param(value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    /// Inclusive range end (YYYY-MM-DD)
    #[param(value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    /// Another user's records (requires admin)
    pub user_id: Option<u64>,
    pub status: Option<AttendanceStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(serde::Serialize, ToSchema)]
pub struct RecordListResponse {
    pub data: Vec<AttendanceRecord>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

// Typed SQLx binding for the dynamic WHERE clause
enum FilterValue {
    U64(u64),
    Str(String),
    Date(NaiveDate),
}

/// Manual check-in / check-out
///
/// First call of the day checks in, second checks out, a third is
/// rejected. Fallback for when face recognition is unavailable.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    request_body = CheckInRequest,
    responses(
        (status = 201, description = "Checked in", body = Object, example = json!({
            "success": true,
            "message": "Check-in successful",
            "action": "check_in"
        })),
        (status = 200, description = "Checked out", body = Object, example = json!({
            "success": true,
            "message": "Check-out successful",
            "action": "check_out"
        })),
        (status = 400, description = "Already checked in and out for today", body = Object, example = json!({
            "success": false,
            "error": "Already checked in and out for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    principal: Principal,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    bus: web::Data<EventBus>,
    payload: Option<web::Json<CheckInRequest>>,
) -> actix_web::Result<impl Responder> {
    let location = payload.and_then(|p| p.into_inner().location);
    let now = Utc::now().naive_utc();

    let marked = attendance::mark_attendance(
        pool.get_ref(),
        principal.user_id,
        now,
        config.late_after,
        Provenance {
            marked_by_face: false,
            confidence: None,
        },
        location,
    )
    .await;

    match marked {
        Ok(marked) => {
            bus.publish(AttendanceEvent::from_marked(&marked));

            let (message, time, code) = match marked.action {
                MarkAction::CheckIn => (
                    "Check-in successful",
                    marked.record.check_in_time,
                    actix_web::http::StatusCode::CREATED,
                ),
                MarkAction::CheckOut => (
                    "Check-out successful",
                    marked.record.check_out_time,
                    actix_web::http::StatusCode::OK,
                ),
            };

            Ok(HttpResponse::build(code).json(json!({
                "success": true,
                "message": message,
                "action": marked.action,
                "time": time,
                "status": marked.record.status,
            })))
        }
        Err(MarkError::Transition(e)) => Ok(HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": e.to_string()
        }))),
        Err(MarkError::Db(e)) => {
            error!(error = %e, user_id = principal.user_id, "Manual check-in failed");
            Err(ErrorInternalServerError("Internal Server Error"))
        }
    }
}

/// List attendance records
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(RecordQuery),
    responses(
        (status = 200, description = "Paginated attendance records", body = RecordListResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Attendance"
)]
pub async fn list_records(
    principal: Principal,
    pool: web::Data<MySqlPool>,
    query: web::Query<RecordQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // Non-admins only ever see their own rows, whatever they ask for.
    let target_user = if principal.can(Capability::ViewAllAttendance) {
        query.user_id
    } else {
        Some(principal.user_id)
    };

    let mut conditions = Vec::new();
    let mut bindings: Vec<FilterValue> = Vec::new();

    if let Some(user_id) = target_user {
        conditions.push("user_id = ?");
        bindings.push(FilterValue::U64(user_id));
    }
    if let Some(start) = query.start_date {
        conditions.push("date >= ?");
        bindings.push(FilterValue::Date(start));
    }
    if let Some(end) = query.end_date {
        conditions.push("date <= ?");
        bindings.push(FilterValue::Date(end));
    }
    if let Some(status) = query.status {
        conditions.push("status = ?");
        bindings.push(FilterValue::Str(status.to_string()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!(
        "SELECT COUNT(*) FROM attendance_records {}",
        where_clause
    );
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = match b {
            FilterValue::U64(v) => count_query.bind(*v),
            FilterValue::Str(s) => count_query.bind(s.clone()),
            FilterValue::Date(d) => count_query.bind(*d),
        };
    }
    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count attendance records");
        ErrorInternalServerError("Database error")
    })?;

    let data_sql = format!(
        "SELECT * FROM attendance_records {} ORDER BY date DESC, check_in_time DESC LIMIT ? OFFSET ?",
        where_clause
    );
    let mut data_query = sqlx::query_as::<_, AttendanceRecord>(&data_sql);
    for b in &bindings {
        data_query = match b {
            FilterValue::U64(v) => data_query.bind(*v),
            FilterValue::Str(s) => data_query.bind(s.clone()),
            FilterValue::Date(d) => data_query.bind(*d),
        };
    }
    let records = data_query
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch attendance records");
            ErrorInternalServerError("Database error")
        })?;

    Ok(HttpResponse::Ok().json(RecordListResponse {
        data: records,
        page,
        per_page,
        total,
    }))
}

/// Get one attendance record
#[utoipa::path(
    get,
    path = "/api/v1/attendance/{record_id}",
    params(("record_id", Path, description = "Attendance record ID")),
    responses(
        (status = 200, description = "Record found", body = AttendanceRecord),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Record not found")
    ),
    tag = "Attendance"
)]
pub async fn get_record(
    principal: Principal,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let record_id = path.into_inner();

    let record = fetch_by_id(pool.get_ref(), record_id).await?;
    let record = match record {
        Some(r) => r,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Attendance record not found"
            })));
        }
    };

    principal.require_self_or(record.user_id, Capability::ViewAllAttendance)?;

    Ok(HttpResponse::Ok().json(record))
}

/// Update an attendance record (admin)
///
/// Partial update; timestamp ordering is validated against the merged
/// record, so a check-out can never land at or before the check-in.
#[utoipa::path(
    put,
    path = "/api/v1/attendance/{record_id}",
    params(("record_id", Path, description = "Attendance record ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Record updated"),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Record not found")
    ),
    tag = "Attendance"
)]
pub async fn update_record(
    principal: Principal,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    principal.require(Capability::EditAttendance)?;

    let record_id = path.into_inner();
    let existing = match fetch_by_id(pool.get_ref(), record_id).await? {
        Some(r) => r,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Attendance record not found"
            })));
        }
    };

    if let Some(status) = body.get("status").and_then(Value::as_str) {
        if status.parse::<AttendanceStatus>().is_err() {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Invalid status. Allowed: present, absent, late"
            })));
        }
    }

    let check_in = effective_time(&body, "check_in_time", existing.check_in_time)?;
    let check_out = effective_time(&body, "check_out_time", existing.check_out_time)?;
    if let Err(e) = state::validate_interval(check_in, check_out) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": e.to_string()
        })));
    }

    let update = build_update_sql(
        "attendance_records",
        &body,
        &["check_in_time", "check_out_time", "status", "location", "notes"],
        "id",
        record_id,
    )?;

    execute_update(pool.get_ref(), update).await.map_err(|e| {
        error!(error = %e, record_id, "Failed to update attendance record");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Attendance record updated"
    })))
}

/// Delete an attendance record (admin)
#[utoipa::path(
    delete,
    path = "/api/v1/attendance/{record_id}",
    params(("record_id", Path, description = "Attendance record ID")),
    responses(
        (status = 200, description = "Record deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Record not found")
    ),
    tag = "Attendance"
)]
pub async fn delete_record(
    principal: Principal,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    principal.require(Capability::EditAttendance)?;

    let record_id = path.into_inner();
    let result = sqlx::query("DELETE FROM attendance_records WHERE id = ?")
        .bind(record_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, record_id, "Failed to delete attendance record");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Attendance record not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Attendance record deleted"
    })))
}

async fn fetch_by_id(
    pool: &MySqlPool,
    record_id: u64,
) -> actix_web::Result<Option<AttendanceRecord>> {
    sqlx::query_as::<_, AttendanceRecord>("SELECT * FROM attendance_records WHERE id = ?")
        .bind(record_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, record_id, "Failed to fetch attendance record");
            ErrorInternalServerError("Internal Server Error")
        })
}

/// The value a timestamp column would hold after this update.
fn effective_time(
    payload: &Value,
    key: &str,
    current: Option<NaiveDateTime>,
) -> actix_web::Result<Option<NaiveDateTime>> {
    match payload.get(key) {
        None => Ok(current),
        Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => match parse_datetime(s) {
            Some(stamp) => Ok(Some(stamp)),
            None => Err(actix_web::error::ErrorBadRequest(format!(
                "{key} must be YYYY-MM-DDTHH:MM:SS"
            ))),
        },
        Some(_) => Err(actix_web::error::ErrorBadRequest(format!(
            "{key} must be a string timestamp or null"
        ))),
    }
}
