use crate::model::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub first_name: String,
    pub last_name: Option<String>,
    #[schema(example = "jane@school.edu", format = "email", value_type = String)]
    pub email: String,
    /// One of student / employee / admin.
    #[schema(example = "student")]
    pub user_type: String,
    /// Auto-generated `EMP####` code for employees.
    pub employee_id: Option<String>,
    /// Auto-generated `STU####` code for students.
    pub student_id: Option<String>,
    pub phone_number: Option<String>,
    pub department: Option<String>,
    pub is_active: bool,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Option<Role> {
        Role::from_str(&self.user_type).ok()
    }

    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// Public projection returned by the recognition endpoint, which is
/// reachable without identity headers.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    pub full_name: String,
    pub user_type: String,
    pub department: Option<String>,
    pub employee_id: Option<String>,
    pub student_id: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name(),
            user_type: user.user_type.clone(),
            department: user.department.clone(),
            employee_id: user.employee_id.clone(),
            student_id: user.student_id.clone(),
        }
    }
}
