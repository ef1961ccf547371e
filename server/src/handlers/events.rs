use axum::extract::State;
use axum::response::Response;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::{NewEvent, Role};
use crate::services::events;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{ApiJson, ApiPath};
use crate::utils::response::{created, success};

pub async fn create_event(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<NewEvent>,
) -> Result<Response, AppError> {
    user.require_role(Role::Organiser)?;
    user.require_not_suspended()?;

    let event = events::create_event(state.store.as_ref(), &user.0, body).await?;
    Ok(created(event, "Event created and awaiting approval"))
}

pub async fn get_event(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Response, AppError> {
    let detail = events::event_with_tickets(state.store.as_ref(), id).await?;
    Ok(success(detail, "Event retrieved successfully"))
}

pub async fn total_amount(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Response, AppError> {
    let revenue = events::revenue(state.store.as_ref(), id).await?;
    Ok(success(revenue, "Total amount retrieved successfully"))
}

pub async fn list_events(State(state): State<AppState>) -> Result<Response, AppError> {
    let events = state.store.list_events().await?;
    Ok(success(events, "Events retrieved successfully"))
}

pub async fn my_events(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, AppError> {
    user.require_role(Role::Organiser)?;

    let events = state.store.events_for_organiser(user.0.id).await?;
    Ok(success(events, "Events retrieved successfully"))
}

pub async fn payments_received(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, AppError> {
    user.require_role(Role::Organiser)?;

    let payments = state.store.payments_for_organiser(user.0.id).await?;
    Ok(success(payments, "Payments retrieved successfully"))
}
