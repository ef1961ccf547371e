use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    Decrement, EventLedger, PaymentStore, Settlement, SettlementOutcome, StoreError, StoreResult,
    TicketStore, UserStore,
};
use crate::models::{Event, EventStatus, PaymentRecord, PaymentStatus, Ticket, User};

/// Process-local store. A single lock guards all collections, which makes
/// every mutation below serial.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    events: HashMap<Uuid, Event>,
    tickets: HashMap<Uuid, Ticket>,
    payments: HashMap<String, PaymentRecord>,
}

impl State {
    fn decrement(&mut self, id: Uuid, quantity: i32) -> Decrement {
        let Some(ticket) = self.tickets.get_mut(&id) else {
            return Decrement::Missing;
        };
        if ticket.remaining_quantity < quantity {
            return Decrement::Insufficient {
                remaining: ticket.remaining_quantity,
            };
        }
        ticket.remaining_quantity -= quantity;
        ticket.updated_at = Utc::now();
        Decrement::Applied {
            remaining: ticket.remaining_quantity,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut payments: Vec<PaymentRecord>) -> Vec<PaymentRecord> {
    payments.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.reference.cmp(&b.reference))
    });
    payments
}

fn sorted_events(mut events: Vec<Event>) -> Vec<Event> {
    events.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    events
}

fn sorted(mut tickets: Vec<Ticket>) -> Vec<Ticket> {
    tickets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    tickets
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn insert_tickets(&self, tickets: &[Ticket]) -> StoreResult<()> {
        let mut state = self.state.write().await;
        for ticket in tickets {
            state.tickets.insert(ticket.id, ticket.clone());
        }
        Ok(())
    }

    async fn find_ticket(&self, id: Uuid) -> StoreResult<Option<Ticket>> {
        Ok(self.state.read().await.tickets.get(&id).cloned())
    }

    async fn list_tickets(&self) -> StoreResult<Vec<Ticket>> {
        let state = self.state.read().await;
        Ok(sorted(state.tickets.values().cloned().collect()))
    }

    async fn list_tickets_for_event(&self, event_id: Uuid) -> StoreResult<Vec<Ticket>> {
        let state = self.state.read().await;
        Ok(sorted(
            state
                .tickets
                .values()
                .filter(|t| t.event_id == event_id)
                .cloned()
                .collect(),
        ))
    }

    async fn decrement_quantity(&self, id: Uuid, quantity: i32) -> StoreResult<Decrement> {
        Ok(self.state.write().await.decrement(id, quantity))
    }

    async fn delete_ticket(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.state.write().await.tickets.remove(&id).is_some())
    }

    async fn tickets_paid_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Ticket>> {
        let state = self.state.read().await;
        Ok(sorted(
            state
                .tickets
                .values()
                .filter(|t| {
                    t.payment_records
                        .iter()
                        .any(|r| r.payment_date >= from && r.payment_date <= to)
                })
                .cloned()
                .collect(),
        ))
    }
}

#[async_trait]
impl EventLedger for MemoryStore {
    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        self.state
            .write()
            .await
            .events
            .insert(event.id, event.clone());
        Ok(())
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.state.read().await.events.get(&id).cloned())
    }

    async fn find_events(&self, ids: &[Uuid]) -> StoreResult<Vec<Event>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.events.get(id).cloned())
            .collect())
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let state = self.state.read().await;
        Ok(sorted_events(state.events.values().cloned().collect()))
    }

    async fn events_for_organiser(&self, organiser_id: Uuid) -> StoreResult<Vec<Event>> {
        let state = self.state.read().await;
        Ok(sorted_events(
            state
                .events
                .values()
                .filter(|e| e.organiser_id == organiser_id)
                .cloned()
                .collect(),
        ))
    }

    async fn decide_event(&self, id: Uuid, status: EventStatus) -> StoreResult<Option<Event>> {
        let mut state = self.state.write().await;
        match state.events.get_mut(&id) {
            Some(event) if event.status == EventStatus::AwaitingApproval => {
                event.status = status;
                event.updated_at = Utc::now();
                Ok(Some(event.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn record_payment_attempt(&self, record: &PaymentRecord) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.payments.contains_key(&record.reference) {
            return Err(StoreError::DuplicateReference(record.reference.clone()));
        }
        let ticket = state
            .tickets
            .get_mut(&record.ticket_id)
            .ok_or(StoreError::MissingTicket(record.ticket_id))?;
        ticket.payment_records.push(record.summary());
        state
            .payments
            .insert(record.reference.clone(), record.clone());
        Ok(())
    }

    async fn find_payment(&self, reference: &str) -> StoreResult<Option<PaymentRecord>> {
        Ok(self.state.read().await.payments.get(reference).cloned())
    }

    async fn list_payments(&self) -> StoreResult<Vec<PaymentRecord>> {
        let state = self.state.read().await;
        Ok(newest_first(state.payments.values().cloned().collect()))
    }

    async fn payments_for_organiser(&self, organiser_id: Uuid) -> StoreResult<Vec<PaymentRecord>> {
        let state = self.state.read().await;
        let owned = |record: &&PaymentRecord| {
            state
                .tickets
                .get(&record.ticket_id)
                .and_then(|t| state.events.get(&t.event_id))
                .is_some_and(|e| e.organiser_id == organiser_id)
        };
        Ok(newest_first(
            state.payments.values().filter(owned).cloned().collect(),
        ))
    }

    async fn mark_payment_failed(&self, reference: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if let Some(record) = state.payments.get_mut(reference) {
            if record.status == PaymentStatus::Pending {
                record.status = PaymentStatus::Failed;
            }
        }
        Ok(())
    }

    async fn settle(&self, settlement: &Settlement) -> StoreResult<SettlementOutcome> {
        let mut state = self.state.write().await;

        let status = match state.payments.get(&settlement.reference) {
            Some(record) => record.status,
            None => return Ok(SettlementOutcome::UnknownReference),
        };

        if status == PaymentStatus::Confirmed {
            return Ok(match state.tickets.get(&settlement.ticket_id) {
                Some(ticket) => SettlementOutcome::AlreadySettled {
                    remaining: ticket.remaining_quantity,
                },
                None => SettlementOutcome::MissingTicket,
            });
        }

        let remaining = match state.decrement(settlement.ticket_id, settlement.quantity) {
            Decrement::Applied { remaining } => remaining,
            Decrement::Insufficient { remaining } => {
                return Ok(SettlementOutcome::Insufficient { remaining })
            }
            Decrement::Missing => return Ok(SettlementOutcome::MissingTicket),
        };

        let now = Utc::now();
        let event_id = state.tickets[&settlement.ticket_id].event_id;
        if let Some(event) = state.events.get_mut(&event_id) {
            event.amount_gotten += settlement.amount;
            event.updated_at = now;
        }
        if let Some(record) = state.payments.get_mut(&settlement.reference) {
            record.status = PaymentStatus::Confirmed;
            record.settled_amount = Some(settlement.amount);
            record.paid_at = Some(now);
        }

        Ok(SettlementOutcome::Settled {
            event_id,
            remaining,
        })
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.state.write().await.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }
}
