//! Caller identity extracted from request headers.
//!
//! Authentication itself happens upstream; the fronting auth layer sets
//! identity headers after validating the session. This service treats
//! "user is signed in" and "user is admin" as externally supplied facts
//! and passes them explicitly into every operation.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;

/// Authenticated caller identity.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub email: Option<String>,
    pub roles: Vec<String>,
}

impl AuthContext {
    pub fn new(user_id: String, email: Option<String>, roles: Vec<String>) -> Self {
        Self {
            user_id,
            email,
            roles,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == "admin")
    }

    /// Reject callers without the administrator role.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(anyhow::anyhow!(
                "Administrator role required"
            )))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!(
                    "Missing X-User-Id header (set by the auth layer)"
                ))
            })?;

        let email = parts
            .headers
            .get("X-User-Email")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let roles = parts
            .headers
            .get("X-User-Roles")
            .and_then(|v| v.to_str().ok())
            .map(|s| {
                s.split(',')
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        // Attach to the request span for observability
        let span = tracing::Span::current();
        span.record("user_id", user_id);

        Ok(AuthContext::new(user_id.to_string(), email, roles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_role_is_recognized() {
        let ctx = AuthContext::new(
            "u1".into(),
            None,
            vec!["member".into(), "admin".into()],
        );
        assert!(ctx.is_admin());
        assert!(ctx.require_admin().is_ok());
    }

    #[test]
    fn missing_admin_role_is_forbidden() {
        let ctx = AuthContext::new("u1".into(), None, vec!["member".into()]);
        assert!(!ctx.is_admin());
        let err = ctx.require_admin().unwrap_err();
        assert_eq!(err.reason(), "admin_required");
    }
}
