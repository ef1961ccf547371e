use axum::extract::{Query, State};
use axum::response::Response;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::{NewTicket, QuantityInput, Role};
use crate::services::inventory;
use crate::services::reports::{self, PaymentWindow};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{ApiJson, ApiPath};
use crate::utils::response::{created, empty_success, success};

#[derive(Debug, Deserialize)]
pub struct CreateTicketsRequest {
    pub tickets: Vec<NewTicket>,
}

#[derive(Debug, Deserialize)]
pub struct PayRequest {
    pub quantity: QuantityInput,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub reference: String,
}

#[derive(Debug, Deserialize)]
pub struct FreeTicketRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct RecentPaymentsQuery {
    pub filter: Option<String>,
}

pub async fn create_tickets(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(event_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CreateTicketsRequest>,
) -> Result<Response, AppError> {
    user.require_role(Role::Organiser)?;
    user.require_not_suspended()?;

    let tickets = inventory::create_tickets(state.store.as_ref(), &user.0, event_id, body.tickets)
        .await?;
    Ok(created(tickets, "Tickets created successfully"))
}

pub async fn list_tickets(State(state): State<AppState>) -> Result<Response, AppError> {
    let tickets = state.store.list_tickets().await?;
    Ok(success(tickets, "Tickets retrieved successfully"))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Response, AppError> {
    let ticket = state
        .store
        .find_ticket(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;
    Ok(success(ticket, "Ticket retrieved successfully"))
}

pub async fn tickets_for_event(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<Uuid>,
) -> Result<Response, AppError> {
    let tickets = state.store.list_tickets_for_event(event_id).await?;
    Ok(success(tickets, "Tickets retrieved successfully"))
}

pub async fn initiate_purchase(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(ticket_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<PayRequest>,
) -> Result<Response, AppError> {
    let intent = state
        .settlement
        .initiate_purchase(ticket_id, &user.0, &body.quantity, &body.email)
        .await?;
    Ok(success(intent, "Payment initialized"))
}

pub async fn confirm_purchase(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(ticket_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<VerifyRequest>,
) -> Result<Response, AppError> {
    let receipt = state
        .settlement
        .confirm_purchase(ticket_id, &body.reference)
        .await?;
    let message = if receipt.sold_out {
        "Payment successful. This ticket is now sold out"
    } else {
        "Payment successful"
    };
    Ok(success(receipt, message))
}

pub async fn issue_free_ticket(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(ticket_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<FreeTicketRequest>,
) -> Result<Response, AppError> {
    let issue = state
        .settlement
        .issue_free_ticket(ticket_id, &body.email)
        .await?;
    Ok(success(issue, "Ticket sent successfully"))
}

pub async fn recent_payments(
    State(state): State<AppState>,
    Query(query): Query<RecentPaymentsQuery>,
) -> Result<Response, AppError> {
    let window = PaymentWindow::parse(query.filter.as_deref())?;
    let events = reports::recent_payment_events(state.store.as_ref(), window, Utc::now()).await?;
    Ok(success(events, "Recent payments retrieved successfully"))
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Response, AppError> {
    user.require_role(Role::Admin)?;

    if !state.store.delete_ticket(id).await? {
        return Err(AppError::NotFound("Ticket not found".to_string()));
    }
    tracing::info!(ticket_id = %id, "Ticket deleted");
    Ok(empty_success("Ticket deleted successfully"))
}
