use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Caller role. Stored in `users.user_type` and carried on every request
/// by the gateway identity headers.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Employee,
    Admin,
}

/// Privileged operations, checked against the capability table below
/// instead of comparing role strings at each call site.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Capability {
    /// List, update, and delete other users.
    ManageUsers,
    /// Create/update holidays and attendance sessions.
    ManageCalendar,
    /// Read any user's attendance records and stats.
    ViewAllAttendance,
    /// Mutate or delete attendance records directly.
    EditAttendance,
    /// Cohort-wide attendance reports.
    ViewReports,
    /// Register or delete face encodings for other users.
    ManageFaceData,
    /// Read all recognition logs and matcher stats.
    ViewRecognitionLogs,
}

impl Role {
    /// Capability table. Students and employees act only on their own
    /// rows; every privileged operation is admin-only.
    pub fn can(self, capability: Capability) -> bool {
        match (self, capability) {
            (Role::Admin, _) => true,
            (Role::Student | Role::Employee, _) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_role_strings() {
        assert_eq!(Role::from_str("student").unwrap(), Role::Student);
        assert_eq!(Role::from_str("Admin").unwrap(), Role::Admin);
        assert!(Role::from_str("superuser").is_err());
    }

    #[test]
    fn admin_holds_every_capability() {
        for cap in [
            Capability::ManageUsers,
            Capability::ManageCalendar,
            Capability::ViewAllAttendance,
            Capability::EditAttendance,
            Capability::ViewReports,
            Capability::ManageFaceData,
            Capability::ViewRecognitionLogs,
        ] {
            assert!(Role::Admin.can(cap));
            assert!(!Role::Student.can(cap));
            assert!(!Role::Employee.can(cap));
        }
    }
}
