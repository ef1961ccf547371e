//! Persistence seams, implemented by [`PgStore`] and [`MemoryStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Event, EventStatus, PaymentRecord, Ticket, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("payment reference '{0}' already exists")]
    DuplicateReference(String),

    #[error("ticket {0} does not exist")]
    MissingTicket(Uuid),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decrement {
    Applied { remaining: i32 },
    Insufficient { remaining: i32 },
    Missing,
}

/// A gateway-verified payment ready to be applied to inventory and revenue.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub reference: String,
    pub ticket_id: Uuid,
    pub quantity: i32,
    /// Gateway-confirmed amount in major units.
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    Settled { event_id: Uuid, remaining: i32 },
    /// The reference was confirmed by an earlier call; nothing changed.
    AlreadySettled { remaining: i32 },
    Insufficient { remaining: i32 },
    UnknownReference,
    MissingTicket,
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Inserts all tickets in one unit of work.
    async fn insert_tickets(&self, tickets: &[Ticket]) -> StoreResult<()>;

    async fn find_ticket(&self, id: Uuid) -> StoreResult<Option<Ticket>>;

    async fn list_tickets(&self) -> StoreResult<Vec<Ticket>>;

    async fn list_tickets_for_event(&self, event_id: Uuid) -> StoreResult<Vec<Ticket>>;

    /// Takes `quantity` units off the ticket only if that many remain.
    async fn decrement_quantity(&self, id: Uuid, quantity: i32) -> StoreResult<Decrement>;

    async fn delete_ticket(&self, id: Uuid) -> StoreResult<bool>;

    /// Tickets carrying at least one payment summary dated within the range.
    async fn tickets_paid_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Ticket>>;
}

#[async_trait]
pub trait EventLedger: Send + Sync {
    async fn insert_event(&self, event: &Event) -> StoreResult<()>;

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>>;

    async fn find_events(&self, ids: &[Uuid]) -> StoreResult<Vec<Event>>;

    async fn list_events(&self) -> StoreResult<Vec<Event>>;

    async fn events_for_organiser(&self, organiser_id: Uuid) -> StoreResult<Vec<Event>>;

    /// Moves an event out of `AwaitingApproval`. Returns `None` when the
    /// event does not exist or was already decided.
    async fn decide_event(&self, id: Uuid, status: EventStatus) -> StoreResult<Option<Event>>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Persists a pending record and appends its summary to the ticket.
    async fn record_payment_attempt(&self, record: &PaymentRecord) -> StoreResult<()>;

    async fn find_payment(&self, reference: &str) -> StoreResult<Option<PaymentRecord>>;

    /// Every payment record, newest first.
    async fn list_payments(&self) -> StoreResult<Vec<PaymentRecord>>;

    /// Payment records for tickets of events the organiser owns, newest first.
    async fn payments_for_organiser(&self, organiser_id: Uuid) -> StoreResult<Vec<PaymentRecord>>;

    /// Flags a still-pending record as failed. Confirmed records are left alone.
    async fn mark_payment_failed(&self, reference: &str) -> StoreResult<()>;

    /// Decrements stock, accrues event revenue and confirms the record as a
    /// single atomic step.
    async fn settle(&self, settlement: &Settlement) -> StoreResult<SettlementOutcome>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
}

pub trait Store: TicketStore + EventLedger + PaymentStore + UserStore {}

impl<T> Store for T where T: TicketStore + EventLedger + PaymentStore + UserStore {}
