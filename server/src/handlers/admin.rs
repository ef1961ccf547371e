use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::Role;
use crate::services::events;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{ApiJson, ApiPath};
use crate::utils::response::success;

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    /// `"approve"` or `"disapproved"`.
    pub status: String,
}

pub async fn decide_event(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<DecisionRequest>,
) -> Result<Response, AppError> {
    user.require_role(Role::Admin)?;

    let event = events::decide_event(state.store.as_ref(), id, &body.status).await?;
    let message = format!("Event {} successfully", event.status.as_str());
    Ok(success(event, message))
}

pub async fn all_payments(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, AppError> {
    user.require_role(Role::Admin)?;

    let payments = state.store.list_payments().await?;
    Ok(success(payments, "Payments retrieved successfully"))
}
