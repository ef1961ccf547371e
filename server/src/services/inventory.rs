use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::models::{NewTicket, Ticket, User};
use crate::store::Store;
use crate::utils::error::AppError;

const MAX_PRICE_SCALE: u32 = 2;

fn check_ticket(index: usize, ticket: &NewTicket, free_event: bool) -> Result<(), AppError> {
    let position = index + 1;
    match (free_event, ticket.price) {
        (true, Some(_)) => {
            return Err(AppError::InvalidInput(format!(
                "Ticket {position}: tickets of a free event cannot have a price"
            )))
        }
        (false, None) => {
            return Err(AppError::InvalidInput(format!(
                "Ticket {position}: tickets of a paid event must have a price"
            )))
        }
        (false, Some(price)) => {
            if price <= Decimal::ZERO || price.normalize().scale() > MAX_PRICE_SCALE {
                return Err(AppError::InvalidInput(format!(
                    "Ticket {position}: price must be positive with at most two decimal places"
                )));
            }
        }
        (true, None) => {}
    }

    if ticket.quantity < 1 {
        return Err(AppError::InvalidInput(format!(
            "Ticket {position}: quantity must be at least 1"
        )));
    }
    if ticket.sales_start > ticket.sales_end {
        return Err(AppError::InvalidInput(format!(
            "Ticket {position}: sales cannot end before they start"
        )));
    }
    Ok(())
}

/// Creates every ticket type for an event or none of them.
pub async fn create_tickets(
    store: &dyn Store,
    organiser: &User,
    event_id: Uuid,
    tickets: Vec<NewTicket>,
) -> Result<Vec<Ticket>, AppError> {
    let event = store
        .find_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    if event.organiser_id != organiser.id {
        return Err(AppError::Forbidden(
            "You can only create tickets for your own events".to_string(),
        ));
    }
    if tickets.is_empty() {
        return Err(AppError::InvalidInput(
            "At least one ticket is required".to_string(),
        ));
    }

    for (index, ticket) in tickets.iter().enumerate() {
        check_ticket(index, ticket, event.is_free())?;
    }

    let tickets: Vec<Ticket> = tickets
        .into_iter()
        .map(|t| t.into_ticket(event.id))
        .collect();
    store.insert_tickets(&tickets).await?;

    info!(event_id = %event.id, count = tickets.len(), "Tickets created");
    Ok(tickets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, NewEvent, Pricing, Role};
    use crate::store::{EventLedger, MemoryStore, TicketStore};
    use chrono::{Duration, Utc};

    fn new_ticket(price: Option<Decimal>, quantity: i32) -> NewTicket {
        let now = Utc::now();
        NewTicket {
            ticket_type: Some("Regular".into()),
            price,
            quantity,
            sales_start: now,
            sales_end: now + Duration::days(3),
        }
    }

    async fn event(store: &MemoryStore, organiser: &User, pricing: Pricing) -> Event {
        let now = Utc::now();
        let event = NewEvent {
            title: "Launch".into(),
            name: "Launch party".into(),
            pricing,
            summary: None,
            venue: None,
            image: None,
            starts_at: now + Duration::days(5),
            ends_at: now + Duration::days(6),
        }
        .into_event(organiser.id);
        store.insert_event(&event).await.unwrap();
        event
    }

    #[tokio::test]
    async fn test_bulk_create_is_all_or_nothing() {
        let store = MemoryStore::new();
        let organiser = User::new("Org", "org@example.com", Role::Organiser);
        let event = event(&store, &organiser, Pricing::Paid).await;

        let err = create_tickets(
            &store,
            &organiser,
            event.id,
            vec![
                new_ticket(Some(Decimal::new(500, 0)), 10),
                new_ticket(None, 10),
            ],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(m) if m.starts_with("Ticket 2")));
        assert!(store.list_tickets_for_event(event.id).await.unwrap().is_empty());

        let created = create_tickets(
            &store,
            &organiser,
            event.id,
            vec![
                new_ticket(Some(Decimal::new(500, 0)), 10),
                new_ticket(Some(Decimal::new(1250, 1)), 5),
            ],
        )
        .await
        .unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(store.list_tickets_for_event(event.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_free_event_rejects_prices() {
        let store = MemoryStore::new();
        let organiser = User::new("Org", "org@example.com", Role::Organiser);
        let event = event(&store, &organiser, Pricing::Free).await;

        let err = create_tickets(
            &store,
            &organiser,
            event.id,
            vec![new_ticket(Some(Decimal::new(1, 0)), 1)],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let created = create_tickets(&store, &organiser, event.id, vec![new_ticket(None, 50)])
            .await
            .unwrap();
        assert!(created[0].is_free());
    }

    #[tokio::test]
    async fn test_only_the_owner_creates_tickets() {
        let store = MemoryStore::new();
        let owner = User::new("Org", "org@example.com", Role::Organiser);
        let other = User::new("Rival", "rival@example.com", Role::Organiser);
        let event = event(&store, &owner, Pricing::Paid).await;

        let err = create_tickets(
            &store,
            &other,
            event.id,
            vec![new_ticket(Some(Decimal::new(500, 0)), 1)],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_ticket_field_rules() {
        let paid = |price: i64, scale: u32| new_ticket(Some(Decimal::new(price, scale)), 1);
        assert!(check_ticket(0, &paid(1999, 2), false).is_ok());
        assert!(check_ticket(0, &paid(19990, 3), false).is_ok());
        assert!(check_ticket(0, &paid(19999, 3), false).is_err());
        assert!(check_ticket(0, &paid(0, 0), false).is_err());
        assert!(check_ticket(0, &new_ticket(Some(Decimal::ONE), 0), false).is_err());

        let mut backwards = new_ticket(None, 1);
        backwards.sales_end = backwards.sales_start - Duration::hours(1);
        assert!(check_ticket(0, &backwards, true).is_err());
    }
}
