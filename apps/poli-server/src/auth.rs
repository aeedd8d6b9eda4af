//! Caller identity.
//!
//! Sessions are handled upstream; the proxy in front of this server forwards
//! the authenticated user as two headers:
//!
//! ```text
//! x-user-id:   8b1f...      (user id)
//! x-user-role: ADMIN        (USER | ADMIN | SYSADMIN)
//! ```

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::error::ApiError;
use poli_core::{Caller, Role};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Extractor for the caller of a request. Rejects with 401.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Caller);

impl Authenticated {
    /// Rejects with 403 unless the caller may manage cash.
    pub fn require_cash_manager(&self) -> Result<(), ApiError> {
        if self.0.role.can_manage_cash() {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "Role {} is not allowed to view the cash register ledger",
                self.0.role
            )))
        }
    }

    /// Rejects with 403 unless the caller is a SYSADMIN.
    pub fn require_sysadmin(&self, action: &str) -> Result<(), ApiError> {
        if self.0.role.can_configure() {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "Role {} is not allowed to {action}",
                self.0.role
            )))
        }
    }
}

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_from_headers(&parts.headers).map(Authenticated)
    }
}

fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, ApiError> {
    let user_id = header_value(headers, USER_ID_HEADER)
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

    let role: Role = header_value(headers, USER_ROLE_HEADER)
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?
        .parse()
        .map_err(|_| ApiError::unauthorized("Unknown user role"))?;

    Ok(Caller::new(user_id, role))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_caller_from_headers() {
        let caller =
            caller_from_headers(&headers(&[(USER_ID_HEADER, "u-1"), (USER_ROLE_HEADER, "admin")]))
                .unwrap();
        assert_eq!(caller, Caller::new("u-1", Role::Admin));
    }

    #[test]
    fn test_missing_or_unknown_role() {
        let err = caller_from_headers(&headers(&[(USER_ID_HEADER, "u-1")])).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err = caller_from_headers(&headers(&[(USER_ID_HEADER, "u-1"), (USER_ROLE_HEADER, "CHEF")]))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err = caller_from_headers(&headers(&[(USER_ROLE_HEADER, "USER")])).unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
    }
}
