use crate::attendance::stats::{self, AttendanceSummary};
use crate::auth::principal::Principal;
use crate::model::attendance::AttendanceRecord;
use crate::model::role::{Capability, Role};
use crate::model::user::User;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct StatsQuery {
    /// Another user's stats (requires admin)
    pub user_id: Option<u64>,
    /// Defaults to the first of the current month
    #[param(value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    /// Defaults to today
    #[param(value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReportQuery {
    #[param(value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[param(value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    /// Filter by role (student / employee / admin)
    pub user_type: Option<String>,
    pub department: Option<String>,
}

/// Per-user attendance statistics
#[utoipa::path(
    get,
    path = "/api/v1/attendance/stats",
    params(StatsQuery),
    responses(
        (status = 200, description = "Summary for the user and range", body = Object, example = json!({
            "user_id": 12,
            "username": "jdoe",
            "period": {"start_date": "2026-01-01", "end_date": "2026-01-31"},
            "total_days": 31,
            "working_days": 29,
            "present_days": 20,
            "absent_days": 0,
            "late_days": 2,
            "attendance_percentage": 75.86,
            "average_check_in_time": "08:52:30",
            "total_hours_worked": "160:00:00"
        })),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    tag = "Stats"
)]
pub async fn attendance_stats(
    principal: Principal,
    pool: web::Data<MySqlPool>,
    query: web::Query<StatsQuery>,
) -> actix_web::Result<impl Responder> {
    let target_user = match query.user_id {
        Some(id) if id != principal.user_id => {
            principal.require(Capability::ViewAllAttendance)?;
            id
        }
        _ => principal.user_id,
    };

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(target_user)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, target_user, "Failed to fetch user for stats");
            ErrorInternalServerError("Internal Server Error")
        })?;
    let user = match user {
        Some(u) => u,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({"error": "User not found"})));
        }
    };

    let (start, end) = match resolve_range(query.start_date, query.end_date) {
        Ok(range) => range,
        Err(message) => {
            return Ok(HttpResponse::BadRequest().json(json!({"error": message})));
        }
    };

    let summary = summarize_user(pool.get_ref(), user.id, start, end).await?;
    let mut body = serde_json::to_value(&summary).map_err(|e| {
        error!(error = %e, "Failed to serialize summary");
        ErrorInternalServerError("Internal Server Error")
    })?;
    if let Value::Object(map) = &mut body {
        map.insert("user_id".into(), json!(user.id));
        map.insert("username".into(), json!(user.username));
        map.insert(
            "period".into(),
            json!({"start_date": start, "end_date": end}),
        );
    }

    Ok(HttpResponse::Ok().json(body))
}

/// Cohort attendance report (admin)
///
/// Repeats the per-user roll-up across the filtered population and adds
/// the unweighted mean of the per-user percentages.
#[utoipa::path(
    get,
    path = "/api/v1/attendance/report",
    params(ReportQuery),
    responses(
        (status = 200, description = "Per-user rows plus cohort summary", body = Object),
        (status = 400, description = "Bad filter"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Stats"
)]
pub async fn attendance_report(
    principal: Principal,
    pool: web::Data<MySqlPool>,
    query: web::Query<ReportQuery>,
) -> actix_web::Result<impl Responder> {
    principal.require(Capability::ViewReports)?;

    if let Some(user_type) = &query.user_type {
        if user_type.parse::<Role>().is_err() {
            return Ok(HttpResponse::BadRequest().json(json!({
                "error": "Invalid user_type. Allowed: student, employee, admin"
            })));
        }
    }

    let (start, end) = match resolve_range(query.start_date, query.end_date) {
        Ok(range) => range,
        Err(message) => {
            return Ok(HttpResponse::BadRequest().json(json!({"error": message})));
        }
    };

    let mut sql = String::from("SELECT * FROM users WHERE is_active = TRUE");
    if query.user_type.is_some() {
        sql.push_str(" AND user_type = ?");
    }
    if query.department.is_some() {
        sql.push_str(" AND department = ?");
    }
    sql.push_str(" ORDER BY username");

    let mut users_query = sqlx::query_as::<_, User>(&sql);
    if let Some(user_type) = &query.user_type {
        users_query = users_query.bind(user_type.to_lowercase());
    }
    if let Some(department) = &query.department {
        users_query = users_query.bind(department.clone());
    }
    let users = users_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to fetch report population");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let holidays = count_holidays(pool.get_ref(), start, end).await?;

    let mut report = Vec::with_capacity(users.len());
    let mut percentages = Vec::with_capacity(users.len());

    for user in &users {
        let records = fetch_records(pool.get_ref(), user.id, start, end).await?;
        let summary = stats::summarize(start, end, holidays, &records);
        percentages.push(summary.attendance_percentage);

        report.push(json!({
            "user_id": user.id,
            "username": user.username,
            "full_name": user.full_name(),
            "email": user.email,
            "user_type": user.user_type,
            "department": user.department,
            "employee_id": user.employee_id,
            "student_id": user.student_id,
            "present_days": summary.present_days,
            "absent_days": summary.absent_days,
            "late_days": summary.late_days,
            "working_days": summary.working_days,
            "attendance_percentage": summary.attendance_percentage,
        }));
    }

    Ok(HttpResponse::Ok().json(json!({
        "period": {"start_date": start, "end_date": end},
        "filters": {
            "user_type": query.user_type,
            "department": query.department,
        },
        "report": report,
        "summary": {
            "total_users": report.len(),
            "average_attendance": stats::cohort_average(&percentages),
        }
    })))
}

/// Default range: first of the current month through today.
fn resolve_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(NaiveDate, NaiveDate), &'static str> {
    let today = Utc::now().date_naive();
    let start = match start {
        Some(date) => date,
        None => today
            .with_day(1)
            .ok_or("could not compute start of month")?,
    };
    let end = end.unwrap_or(today);

    if start > end {
        return Err("start_date cannot be after end_date");
    }
    Ok((start, end))
}

async fn summarize_user(
    pool: &MySqlPool,
    user_id: u64,
    start: NaiveDate,
    end: NaiveDate,
) -> actix_web::Result<AttendanceSummary> {
    let records = fetch_records(pool, user_id, start, end).await?;
    let holidays = count_holidays(pool, start, end).await?;
    Ok(stats::summarize(start, end, holidays, &records))
}

async fn fetch_records(
    pool: &MySqlPool,
    user_id: u64,
    start: NaiveDate,
    end: NaiveDate,
) -> actix_web::Result<Vec<AttendanceRecord>> {
    sqlx::query_as::<_, AttendanceRecord>(
        "SELECT * FROM attendance_records WHERE user_id = ? AND date BETWEEN ? AND ?",
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        error!(error = %e, user_id, "Failed to fetch records for stats");
        ErrorInternalServerError("Internal Server Error")
    })
}

async fn count_holidays(
    pool: &MySqlPool,
    start: NaiveDate,
    end: NaiveDate,
) -> actix_web::Result<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM holidays WHERE date BETWEEN ? AND ? AND is_active = TRUE",
    )
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to count holidays");
        ErrorInternalServerError("Internal Server Error")
    })
}
