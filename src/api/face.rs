use crate::attendance::{self, MarkError, Provenance};
use crate::attendance::stats::round2;
use crate::auth::principal::Principal;
use crate::config::Config;
use crate::events::{AttendanceEvent, EventBus};
use crate::face::service::{FaceService, RecognitionError};
use crate::model::face::{FaceEncodingMeta, RecognitionLog};
use crate::model::role::Capability;
use crate::model::user::{User, UserProfile};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
pub struct RecognizeQuery {
    /// Free-text label for where the capture happened
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LogQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(serde::Serialize, ToSchema)]
pub struct LogListResponse {
    pub data: Vec<RecognitionLog>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Recognize a face and mark attendance
///
/// Anonymous endpoint for kiosk cameras; rate-limited at the route. The
/// body is the raw image. On a positive identification the check-in
/// state machine runs for the matched user.
#[utoipa::path(
    post,
    path = "/api/v1/face/recognize",
    params(RecognizeQuery),
    request_body(content = Vec<u8>, content_type = "application/octet-stream", description = "Raw image bytes"),
    responses(
        (status = 200, description = "Recognition result", body = Object, example = json!({
            "success": true,
            "confidence": 0.87,
            "action": "check_in",
            "attendance_marked": true
        })),
        (status = 400, description = "Empty image"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Face"
)]
pub async fn recognize(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    bus: web::Data<EventBus>,
    service: web::Data<FaceService>,
    query: web::Query<RecognizeQuery>,
    image: web::Bytes,
) -> actix_web::Result<impl Responder> {
    if image.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": "Image body is required"
        })));
    }

    let location = query.location.clone();
    let identified = service
        .recognize(pool.get_ref(), image.to_vec(), location.clone())
        .await;

    let ident = match identified {
        Ok(ident) => ident,
        Err(RecognitionError::Failed(msg)) => {
            error!(error = %msg, "Face recognition failed");
            return Err(ErrorInternalServerError("Internal Server Error"));
        }
        // Domain outcomes (no face, several faces, nobody close enough)
        // are results, not transport errors.
        Err(err) => {
            return Ok(HttpResponse::Ok().json(json!({
                "success": false,
                "error": err.to_string(),
                "confidence": err.confidence()
            })));
        }
    };

    let mut response = json!({
        "success": true,
        "confidence": ident.confidence,
        "processing_time": round2(ident.processing_time),
        "user": UserProfile::from(&ident.user),
    });

    let now = Utc::now().naive_utc();
    let marked = attendance::mark_attendance(
        pool.get_ref(),
        ident.user.id,
        now,
        config.late_after,
        Provenance {
            marked_by_face: true,
            confidence: Some(ident.confidence),
        },
        location,
    )
    .await;

    match marked {
        Ok(marked) => {
            bus.publish(AttendanceEvent::from_marked(&marked));
            response["attendance_marked"] = json!(true);
            response["action"] = json!(marked.action);
            response["status"] = json!(marked.record.status);
        }
        // Recognized fine, but the day's record is already closed.
        Err(MarkError::Transition(e)) => {
            response["attendance_marked"] = json!(false);
            response["error"] = json!(e.to_string());
        }
        Err(MarkError::Db(e)) => {
            error!(error = %e, user_id = ident.user.id, "Attendance marking failed after recognition");
            return Err(ErrorInternalServerError("Internal Server Error"));
        }
    }

    Ok(HttpResponse::Ok().json(response))
}

/// Register a user's face
#[utoipa::path(
    post,
    path = "/api/v1/face/register/{user_id}",
    params(("user_id", Path, description = "User to register the face for")),
    request_body(content = Vec<u8>, content_type = "application/octet-stream", description = "Raw image bytes"),
    responses(
        (status = 201, description = "Face registered"),
        (status = 400, description = "No face / multiple faces in the image"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    tag = "Face"
)]
pub async fn register_face(
    principal: Principal,
    pool: web::Data<MySqlPool>,
    service: web::Data<FaceService>,
    path: web::Path<u64>,
    image: web::Bytes,
) -> actix_web::Result<impl Responder> {
    let user_id = path.into_inner();
    principal.require_self_or(user_id, Capability::ManageFaceData)?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to fetch user");
            ErrorInternalServerError("Internal Server Error")
        })?;
    let user = match user {
        Some(u) => u,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({"error": "User not found"})));
        }
    };

    match service.register(pool.get_ref(), user_id, image.to_vec()).await {
        Ok(()) => Ok(HttpResponse::Created().json(json!({
            "success": true,
            "message": format!("Face registered successfully for {}", user.username)
        }))),
        Err(RecognitionError::Failed(msg)) => {
            error!(error = %msg, user_id, "Face registration failed");
            Err(ErrorInternalServerError("Internal Server Error"))
        }
        Err(err) => Ok(HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": err.to_string()
        }))),
    }
}

/// Delete a user's face encoding
#[utoipa::path(
    delete,
    path = "/api/v1/face/register/{user_id}",
    params(("user_id", Path, description = "User whose encoding to delete")),
    responses(
        (status = 200, description = "Encoding deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No encoding for this user")
    ),
    tag = "Face"
)]
pub async fn delete_encoding(
    principal: Principal,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let user_id = path.into_inner();
    principal.require_self_or(user_id, Capability::ManageFaceData)?;

    let result = sqlx::query("DELETE FROM face_encodings WHERE user_id = ?")
        .bind(user_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to delete face encoding");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "error": "No face encoding found for this user"
        })));
    }

    crate::utils::gallery_cache::invalidate().await;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Face encoding deleted"
    })))
}

/// List face encodings (metadata only)
#[utoipa::path(
    get,
    path = "/api/v1/face/encodings",
    responses(
        (status = 200, description = "Encoding metadata", body = [FaceEncodingMeta])
    ),
    tag = "Face"
)]
pub async fn list_encodings(
    principal: Principal,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    const COLUMNS: &str = "id, user_id, tolerance, is_active, created_at, updated_at";

    let rows = if principal.can(Capability::ManageFaceData) {
        sqlx::query_as::<_, FaceEncodingMeta>(&format!(
            "SELECT {COLUMNS} FROM face_encodings ORDER BY created_at DESC"
        ))
        .fetch_all(pool.get_ref())
        .await
    } else {
        sqlx::query_as::<_, FaceEncodingMeta>(&format!(
            "SELECT {COLUMNS} FROM face_encodings WHERE user_id = ?"
        ))
        .bind(principal.user_id)
        .fetch_all(pool.get_ref())
        .await
    };

    let rows = rows.map_err(|e| {
        error!(error = %e, "Failed to fetch face encodings");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(rows))
}

/// List recognition attempts
#[utoipa::path(
    get,
    path = "/api/v1/face/logs",
    params(LogQuery),
    responses(
        (status = 200, description = "Paginated recognition log", body = LogListResponse)
    ),
    tag = "Face"
)]
pub async fn list_logs(
    principal: Principal,
    pool: web::Data<MySqlPool>,
    query: web::Query<LogQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(50).clamp(1, 200);
    let offset = (page - 1) * per_page;

    let scope_all = principal.can(Capability::ViewRecognitionLogs);
    let where_clause = if scope_all { "" } else { "WHERE user_id = ?" };

    let count_sql = format!("SELECT COUNT(*) FROM recognition_logs {}", where_clause);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    if !scope_all {
        count_query = count_query.bind(principal.user_id);
    }
    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count recognition logs");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        "SELECT * FROM recognition_logs {} ORDER BY timestamp DESC LIMIT ? OFFSET ?",
        where_clause
    );
    let mut data_query = sqlx::query_as::<_, RecognitionLog>(&data_sql);
    if !scope_all {
        data_query = data_query.bind(principal.user_id);
    }
    let logs = data_query
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch recognition logs");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(LogListResponse {
        data: logs,
        page,
        per_page,
        total,
    }))
}

/// Matcher statistics (admin)
#[utoipa::path(
    get,
    path = "/api/v1/face/stats",
    responses(
        (status = 200, description = "Per-outcome totals, success rate, average latency", body = Object, example = json!({
            "total_attempts": 120,
            "successful": 100,
            "failed": 2,
            "no_face_detected": 10,
            "multiple_faces": 3,
            "unknown_person": 5,
            "success_rate": 83.33,
            "average_processing_time": 0.412
        })),
        (status = 403, description = "Forbidden")
    ),
    tag = "Face"
)]
pub async fn recognition_stats(
    principal: Principal,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    principal.require(Capability::ViewRecognitionLogs)?;

    let counts: Vec<(String, i64)> =
        sqlx::query_as("SELECT outcome, COUNT(*) FROM recognition_logs GROUP BY outcome")
            .fetch_all(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to aggregate recognition logs");
                ErrorInternalServerError("Internal Server Error")
            })?;

    let by_outcome = |name: &str| -> i64 {
        counts
            .iter()
            .find(|(outcome, _)| outcome == name)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    };

    let total: i64 = counts.iter().map(|(_, n)| n).sum();
    let successful = by_outcome("success");
    let success_rate = if total > 0 {
        round2(successful as f64 / total as f64 * 100.0)
    } else {
        0.0
    };

    let avg_processing: Option<f64> = sqlx::query_scalar(
        "SELECT AVG(processing_time) FROM recognition_logs WHERE processing_time IS NOT NULL",
    )
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to average processing time");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "total_attempts": total,
        "successful": successful,
        "failed": by_outcome("failed"),
        "no_face_detected": by_outcome("no_face"),
        "multiple_faces": by_outcome("multiple_faces"),
        "unknown_person": by_outcome("unknown_person"),
        "success_rate": success_rate,
        "average_processing_time": avg_processing.map(|v| (v * 1000.0).round() / 1000.0).unwrap_or(0.0)
    })))
}
