use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::models::{Event, EventStatus, NewEvent, Ticket, User};
use crate::store::Store;
use crate::utils::error::AppError;

#[derive(Debug, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub tickets: Vec<Ticket>,
}

#[derive(Debug, Serialize)]
pub struct EventRevenue {
    pub event_id: Uuid,
    pub amount_gotten: Decimal,
}

pub async fn create_event(
    store: &dyn Store,
    organiser: &User,
    input: NewEvent,
) -> Result<Event, AppError> {
    if input.title.trim().is_empty() || input.name.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Event title and name are required".to_string(),
        ));
    }
    if input.starts_at > input.ends_at {
        return Err(AppError::InvalidInput(
            "An event cannot end before it starts".to_string(),
        ));
    }

    let event = input.into_event(organiser.id);
    store.insert_event(&event).await?;
    info!(event_id = %event.id, organiser_id = %organiser.id, "Event created");
    Ok(event)
}

async fn load(store: &dyn Store, id: Uuid) -> Result<Event, AppError> {
    store
        .find_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
}

pub async fn event_with_tickets(store: &dyn Store, id: Uuid) -> Result<EventDetail, AppError> {
    let event = load(store, id).await?;
    let tickets = store.list_tickets_for_event(event.id).await?;
    Ok(EventDetail { event, tickets })
}

pub async fn revenue(store: &dyn Store, id: Uuid) -> Result<EventRevenue, AppError> {
    let event = load(store, id).await?;
    Ok(EventRevenue {
        event_id: event.id,
        amount_gotten: event.amount_gotten,
    })
}

/// Maps the admin's decision word to the status it sets.
fn parse_decision(decision: &str) -> Result<EventStatus, AppError> {
    match decision.trim() {
        "approve" => Ok(EventStatus::Approved),
        "disapproved" => Ok(EventStatus::Disapproved),
        other => Err(AppError::InvalidInput(format!(
            "Unknown decision '{other}', expected 'approve' or 'disapproved'"
        ))),
    }
}

/// Approves or disapproves an event still awaiting review. Decisions are final.
pub async fn decide_event(store: &dyn Store, id: Uuid, decision: &str) -> Result<Event, AppError> {
    let status = parse_decision(decision)?;
    let current = load(store, id).await?;

    match store.decide_event(id, status).await? {
        Some(event) => {
            info!(event_id = %id, status = status.as_str(), "Event reviewed");
            Ok(event)
        }
        None => {
            let decided = store.find_event(id).await?.unwrap_or(current);
            Err(AppError::Conflict(format!(
                "Event has already been {}",
                decided.status.as_str()
            )))
        }
    }
}
