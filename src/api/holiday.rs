use crate::auth::principal::Principal;
use crate::model::holiday::Holiday;
use crate::model::role::Capability;
use crate::utils::db_utils::{build_update_sql, execute_update};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateHoliday {
    #[schema(example = "Republic Day")]
    pub name: String,
    #[schema(example = "2026-01-26", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub description: Option<String>,
}

/// List holidays
#[utoipa::path(
    get,
    path = "/api/v1/holidays",
    responses(
        (status = 200, description = "All holidays, newest first", body = [Holiday])
    ),
    tag = "Calendar"
)]
pub async fn list_holidays(
    _principal: Principal,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let holidays = sqlx::query_as::<_, Holiday>("SELECT * FROM holidays ORDER BY date DESC")
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch holidays");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(holidays))
}

/// Create a holiday (admin)
#[utoipa::path(
    post,
    path = "/api/v1/holidays",
    request_body = CreateHoliday,
    responses(
        (status = 201, description = "Holiday created"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "A holiday already exists on that date")
    ),
    tag = "Calendar"
)]
pub async fn create_holiday(
    principal: Principal,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateHoliday>,
) -> actix_web::Result<impl Responder> {
    principal.require(Capability::ManageCalendar)?;

    let result = sqlx::query(
        "INSERT INTO holidays (name, date, description) VALUES (?, ?, ?)",
    )
    .bind(&payload.name)
    .bind(payload.date)
    .bind(&payload.description)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => Ok(HttpResponse::Created().json(json!({
            "message": "Holiday created"
        }))),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "error": "A holiday already exists on that date"
                    })));
                }
            }
            error!(error = %e, "Failed to create holiday");
            Err(ErrorInternalServerError("Internal Server Error"))
        }
    }
}

/// Update a holiday (admin)
#[utoipa::path(
    put,
    path = "/api/v1/holidays/{holiday_id}",
    params(("holiday_id", Path, description = "Holiday ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Holiday updated"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Holiday not found")
    ),
    tag = "Calendar"
)]
pub async fn update_holiday(
    principal: Principal,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    principal.require(Capability::ManageCalendar)?;

    let holiday_id = path.into_inner();
    let update = build_update_sql(
        "holidays",
        &body,
        &["name", "date", "description", "is_active"],
        "id",
        holiday_id,
    )?;

    let affected = execute_update(pool.get_ref(), update).await.map_err(|e| {
        error!(error = %e, holiday_id, "Failed to update holiday");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({"error": "Holiday not found"})));
    }

    Ok(HttpResponse::Ok().json(json!({"message": "Holiday updated"})))
}

/// Delete a holiday (admin)
#[utoipa::path(
    delete,
    path = "/api/v1/holidays/{holiday_id}",
    params(("holiday_id", Path, description = "Holiday ID")),
    responses(
        (status = 200, description = "Holiday deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Holiday not found")
    ),
    tag = "Calendar"
)]
pub async fn delete_holiday(
    principal: Principal,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    principal.require(Capability::ManageCalendar)?;

    let holiday_id = path.into_inner();
    let result = sqlx::query("DELETE FROM holidays WHERE id = ?")
        .bind(holiday_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, holiday_id, "Failed to delete holiday");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({"error": "Holiday not found"})));
    }

    Ok(HttpResponse::Ok().json(json!({"message": "Holiday deleted"})))
}
