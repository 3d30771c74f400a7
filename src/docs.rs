use crate::api::attendance::{CheckInRequest, RecordListResponse};
use crate::api::face::LogListResponse;
use crate::api::holiday::CreateHoliday;
use crate::api::session::CreateSession;
use crate::api::user::{CreateUser, UserListResponse};
use crate::attendance::stats::AttendanceSummary;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::face::{FaceEncodingMeta, RecognitionLog, RecognitionOutcome};
use crate::model::holiday::Holiday;
use crate::model::role::Role;
use crate::model::session::AttendanceSession;
use crate::model::user::{User, UserProfile};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Management API",
        version = "1.0.0",
        description = r#"
## School / Organization Attendance Backend

Daily attendance tracking for students and employees, with an optional
face-recognition check-in path.

### Key Features
- **Attendance**
  - Two-step daily check-in / check-out with automatic late marking
- **Face Recognition**
  - Register face encodings, recognize at a kiosk, audit every attempt
- **Reporting**
  - Per-user statistics and cohort-wide attendance reports
- **Calendar**
  - Holidays (working-day denominator) and attendance sessions

### Identity
Authentication happens at the upstream gateway, which injects
`X-Auth-User` and `X-Auth-Role` headers. Privileged operations are
admin-only; students and employees operate on their own rows.

### Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::list_records,
        crate::api::attendance::get_record,
        crate::api::attendance::update_record,
        crate::api::attendance::delete_record,

        crate::api::stats::attendance_stats,
        crate::api::stats::attendance_report,

        crate::api::face::recognize,
        crate::api::face::register_face,
        crate::api::face::delete_encoding,
        crate::api::face::list_encodings,
        crate::api::face::list_logs,
        crate::api::face::recognition_stats,

        crate::api::user::create_user,
        crate::api::user::list_users,
        crate::api::user::me,
        crate::api::user::get_user,
        crate::api::user::update_user,
        crate::api::user::delete_user,

        crate::api::holiday::list_holidays,
        crate::api::holiday::create_holiday,
        crate::api::holiday::update_holiday,
        crate::api::holiday::delete_holiday,

        crate::api::session::list_sessions,
        crate::api::session::get_session,
        crate::api::session::create_session
    ),
    components(
        schemas(
            Role,
            User,
            UserProfile,
            CreateUser,
            UserListResponse,
            AttendanceStatus,
            AttendanceRecord,
            CheckInRequest,
            RecordListResponse,
            AttendanceSummary,
            RecognitionOutcome,
            RecognitionLog,
            LogListResponse,
            FaceEncodingMeta,
            Holiday,
            CreateHoliday,
            AttendanceSession,
            CreateSession
        )
    ),
    tags(
        (name = "Attendance", description = "Check-in / check-out and record management"),
        (name = "Face", description = "Face registration, recognition, and audit"),
        (name = "Stats", description = "Attendance statistics and reports"),
        (name = "Users", description = "User account management"),
        (name = "Calendar", description = "Holidays and attendance sessions"),
    )
)]
pub struct ApiDoc;
