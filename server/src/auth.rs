//! Resolves the proxy-forwarded [`USER_ID_HEADER`] to an account.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::models::{AccountStatus, Role, User};
use crate::state::AppState;
use crate::utils::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.0.role != role {
            return Err(AppError::Forbidden(
                "You do not have permission to perform this action".to_string(),
            ));
        }
        Ok(())
    }

    pub fn require_not_suspended(&self) -> Result<(), AppError> {
        if self.0.is_suspended() {
            return Err(AppError::Forbidden(
                "Your account is suspended. Please contact an admin for more inquiries."
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("You are not logged in".to_string()))?;

        let id = header
            .to_str()
            .ok()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .ok_or_else(|| AppError::Unauthorized("Invalid user identity".to_string()))?;

        let user = state.store.find_user(id).await?.ok_or_else(|| {
            AppError::Unauthorized("The user for this session no longer exists".to_string())
        })?;

        if user.status == AccountStatus::Inactive {
            return Err(AppError::Unauthorized(
                "Please verify your account before continuing".to_string(),
            ));
        }

        Ok(AuthUser(user))
    }
}
