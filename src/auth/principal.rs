//! Caller identity.
//!
//! Authentication itself lives in the upstream gateway; by the time a
//! request reaches this service the gateway has already validated the
//! session and injected identity headers. The extractor only parses and
//! gates on them.

use crate::model::role::{Capability, Role};
use actix_web::error::{ErrorForbidden, ErrorUnauthorized};
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};
use std::str::FromStr;

pub const USER_HEADER: &str = "X-Auth-User";
pub const ROLE_HEADER: &str = "X-Auth-Role";

pub struct Principal {
    pub user_id: u64,
    pub role: Role,
}

impl FromRequest for Principal {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user_id = match req
            .headers()
            .get(USER_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
        {
            Some(id) => id,
            None => return ready(Err(ErrorUnauthorized("Missing or invalid identity header"))),
        };

        let role = match req
            .headers()
            .get(ROLE_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| Role::from_str(v).ok())
        {
            Some(role) => role,
            None => return ready(Err(ErrorUnauthorized("Missing or invalid role header"))),
        };

        ready(Ok(Principal { user_id, role }))
    }
}

impl Principal {
    pub fn can(&self, capability: Capability) -> bool {
        self.role.can(capability)
    }

    pub fn require(&self, capability: Capability) -> actix_web::Result<()> {
        if self.role.can(capability) {
            Ok(())
        } else {
            Err(ErrorForbidden("Insufficient role"))
        }
    }

    /// Own-row access, or the capability for anyone else's row.
    pub fn require_self_or(
        &self,
        target_user: u64,
        capability: Capability,
    ) -> actix_web::Result<()> {
        if self.user_id == target_user || self.role.can(capability) {
            Ok(())
        } else {
            Err(ErrorForbidden("Insufficient role"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_access_needs_no_capability() {
        let p = Principal {
            user_id: 7,
            role: Role::Student,
        };
        assert!(p.require_self_or(7, Capability::ManageUsers).is_ok());
        assert!(p.require_self_or(8, Capability::ManageUsers).is_err());
    }

    #[test]
    fn admin_passes_capability_gates() {
        let p = Principal {
            user_id: 1,
            role: Role::Admin,
        };
        assert!(p.require(Capability::ViewReports).is_ok());
        assert!(p.require_self_or(99, Capability::ManageFaceData).is_ok());
    }

    #[test]
    fn non_admin_fails_capability_gates() {
        let p = Principal {
            user_id: 2,
            role: Role::Employee,
        };
        assert!(p.require(Capability::ViewReports).is_err());
        assert!(!p.can(Capability::EditAttendance));
    }
}
