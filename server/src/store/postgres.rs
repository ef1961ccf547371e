use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use super::{
    Decrement, EventLedger, PaymentStore, Settlement, SettlementOutcome, StoreError, StoreResult,
    TicketStore, UserStore,
};
use crate::models::{Event, EventStatus, PaymentRecord, PaymentStatus, PaymentSummary, Ticket, User};

const EVENT_COLUMNS: &str = "id, organiser_id, title, name, summary, venue, image, pricing, \
     status, amount_gotten, starts_at, ends_at, created_at, updated_at";

const TICKET_COLUMNS: &str = "id, event_id, ticket_type, price, remaining_quantity, \
     sales_start, sales_end, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, user_id, ticket_id, email, amount, reference, status, \
     settled_amount, created_at, paid_at";

const USER_COLUMNS: &str = "id, name, email, role, status, created_at, updated_at";

#[derive(FromRow)]
struct SummaryRow {
    ticket_id: Uuid,
    #[sqlx(flatten)]
    summary: PaymentSummary,
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fills in the embedded payment summaries for a batch of tickets.
    async fn attach_summaries(&self, mut tickets: Vec<Ticket>) -> StoreResult<Vec<Ticket>> {
        if tickets.is_empty() {
            return Ok(tickets);
        }
        let ids: Vec<Uuid> = tickets.iter().map(|t| t.id).collect();
        let rows: Vec<SummaryRow> = sqlx::query_as(
            "SELECT ticket_id, payment_id, reference, amount_paid, payment_date \
             FROM ticket_payment_records WHERE ticket_id = ANY($1) ORDER BY payment_date",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_ticket: HashMap<Uuid, Vec<PaymentSummary>> = HashMap::new();
        for row in rows {
            by_ticket.entry(row.ticket_id).or_default().push(row.summary);
        }
        for ticket in &mut tickets {
            ticket.payment_records = by_ticket.remove(&ticket.id).unwrap_or_default();
        }
        Ok(tickets)
    }
}

async fn remaining_in_tx(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> StoreResult<Option<i32>> {
    let remaining = sqlx::query_scalar("SELECT remaining_quantity FROM tickets WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(remaining)
}

fn classify_insert_error(err: sqlx::Error, record: &PaymentRecord) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::DuplicateReference(record.reference.clone());
        }
        if db.is_foreign_key_violation() {
            return StoreError::MissingTicket(record.ticket_id);
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl TicketStore for PgStore {
    async fn insert_tickets(&self, tickets: &[Ticket]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for ticket in tickets {
            sqlx::query(
                "INSERT INTO tickets (id, event_id, ticket_type, price, remaining_quantity, \
                 sales_start, sales_end, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(ticket.id)
            .bind(ticket.event_id)
            .bind(&ticket.ticket_type)
            .bind(ticket.price)
            .bind(ticket.remaining_quantity)
            .bind(ticket.sales_start)
            .bind(ticket.sales_end)
            .bind(ticket.created_at)
            .bind(ticket.updated_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn find_ticket(&self, id: Uuid) -> StoreResult<Option<Ticket>> {
        let ticket: Option<Ticket> =
            sqlx::query_as(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        match ticket {
            Some(ticket) => Ok(self.attach_summaries(vec![ticket]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_tickets(&self) -> StoreResult<Vec<Ticket>> {
        let tickets = sqlx::query_as(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        self.attach_summaries(tickets).await
    }

    async fn list_tickets_for_event(&self, event_id: Uuid) -> StoreResult<Vec<Ticket>> {
        let tickets = sqlx::query_as(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE event_id = $1 ORDER BY created_at, id"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        self.attach_summaries(tickets).await
    }

    async fn decrement_quantity(&self, id: Uuid, quantity: i32) -> StoreResult<Decrement> {
        let mut tx = self.pool.begin().await?;
        let applied: Option<i32> = sqlx::query_scalar(
            "UPDATE tickets SET remaining_quantity = remaining_quantity - $2, updated_at = now() \
             WHERE id = $1 AND remaining_quantity >= $2 RETURNING remaining_quantity",
        )
        .bind(id)
        .bind(quantity)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match applied {
            Some(remaining) => Decrement::Applied { remaining },
            None => match remaining_in_tx(&mut tx, id).await? {
                Some(remaining) => Decrement::Insufficient { remaining },
                None => Decrement::Missing,
            },
        };
        tx.commit().await?;
        Ok(outcome)
    }

    async fn delete_ticket(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn tickets_paid_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Ticket>> {
        let tickets = sqlx::query_as(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets t WHERE EXISTS ( \
                 SELECT 1 FROM ticket_payment_records r \
                 WHERE r.ticket_id = t.id AND r.payment_date BETWEEN $1 AND $2) \
             ORDER BY created_at, id"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        self.attach_summaries(tickets).await
    }
}

#[async_trait]
impl EventLedger for PgStore {
    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO events (id, organiser_id, title, name, summary, venue, image, pricing, \
             status, amount_gotten, starts_at, ends_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(event.id)
        .bind(event.organiser_id)
        .bind(&event.title)
        .bind(&event.name)
        .bind(&event.summary)
        .bind(&event.venue)
        .bind(&event.image)
        .bind(event.pricing.as_str())
        .bind(event.status.as_str())
        .bind(event.amount_gotten)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn find_events(&self, ids: &[Uuid]) -> StoreResult<Vec<Event>> {
        let events = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = ANY($1) ORDER BY created_at, id"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let events = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn events_for_organiser(&self, organiser_id: Uuid) -> StoreResult<Vec<Event>> {
        let events = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE organiser_id = $1 ORDER BY created_at, id"
        ))
        .bind(organiser_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn decide_event(&self, id: Uuid, status: EventStatus) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as(&format!(
            "UPDATE events SET status = $2, updated_at = now() \
             WHERE id = $1 AND status = $3 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(EventStatus::AwaitingApproval.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }
}

#[async_trait]
impl PaymentStore for PgStore {
    async fn record_payment_attempt(&self, record: &PaymentRecord) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO payments (id, user_id, ticket_id, email, amount, reference, status, \
             settled_amount, created_at, paid_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(record.ticket_id)
        .bind(&record.email)
        .bind(record.amount)
        .bind(&record.reference)
        .bind(record.status.as_str())
        .bind(record.settled_amount)
        .bind(record.created_at)
        .bind(record.paid_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| classify_insert_error(e, record))?;

        let summary = record.summary();
        sqlx::query(
            "INSERT INTO ticket_payment_records (payment_id, ticket_id, reference, amount_paid, \
             payment_date) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(summary.payment_id)
        .bind(record.ticket_id)
        .bind(&summary.reference)
        .bind(summary.amount_paid)
        .bind(summary.payment_date)
        .execute(&mut *tx)
        .await
        .map_err(|e| classify_insert_error(e, record))?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_payment(&self, reference: &str) -> StoreResult<Option<PaymentRecord>> {
        let record = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE reference = $1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn list_payments(&self) -> StoreResult<Vec<PaymentRecord>> {
        let records = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments ORDER BY created_at DESC, reference"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn payments_for_organiser(&self, organiser_id: Uuid) -> StoreResult<Vec<PaymentRecord>> {
        let records = sqlx::query_as(
            "SELECT p.id, p.user_id, p.ticket_id, p.email, p.amount, p.reference, p.status, \
             p.settled_amount, p.created_at, p.paid_at \
             FROM payments p \
             JOIN tickets t ON t.id = p.ticket_id \
             JOIN events e ON e.id = t.event_id \
             WHERE e.organiser_id = $1 \
             ORDER BY p.created_at DESC, p.reference",
        )
        .bind(organiser_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn mark_payment_failed(&self, reference: &str) -> StoreResult<()> {
        sqlx::query("UPDATE payments SET status = $2 WHERE reference = $1 AND status = $3")
            .bind(reference)
            .bind(PaymentStatus::Failed.as_str())
            .bind(PaymentStatus::Pending.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn settle(&self, settlement: &Settlement) -> StoreResult<SettlementOutcome> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the payment serializes verifications of one reference.
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM payments WHERE reference = $1 FOR UPDATE")
                .bind(&settlement.reference)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(status) = status else {
            return Ok(SettlementOutcome::UnknownReference);
        };

        if status == PaymentStatus::Confirmed.as_str() {
            let outcome = match remaining_in_tx(&mut tx, settlement.ticket_id).await? {
                Some(remaining) => SettlementOutcome::AlreadySettled { remaining },
                None => SettlementOutcome::MissingTicket,
            };
            tx.commit().await?;
            return Ok(outcome);
        }

        let applied: Option<(i32, Uuid)> = sqlx::query_as(
            "UPDATE tickets SET remaining_quantity = remaining_quantity - $2, updated_at = now() \
             WHERE id = $1 AND remaining_quantity >= $2 RETURNING remaining_quantity, event_id",
        )
        .bind(settlement.ticket_id)
        .bind(settlement.quantity)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((remaining, event_id)) = applied else {
            let outcome = match remaining_in_tx(&mut tx, settlement.ticket_id).await? {
                Some(remaining) => SettlementOutcome::Insufficient { remaining },
                None => SettlementOutcome::MissingTicket,
            };
            tx.rollback().await?;
            return Ok(outcome);
        };

        sqlx::query(
            "UPDATE events SET amount_gotten = amount_gotten + $2, updated_at = now() WHERE id = $1",
        )
        .bind(event_id)
        .bind(settlement.amount)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE payments SET status = $2, settled_amount = $3, paid_at = now() \
             WHERE reference = $1",
        )
        .bind(&settlement.reference)
        .bind(PaymentStatus::Confirmed.as_str())
        .bind(settlement.amount)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(SettlementOutcome::Settled {
            event_id,
            remaining,
        })
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, role, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}
