use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::PaymentSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Failed,
}

text_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Confirmed => "confirmed",
    Failed => "failed",
});

/// One purchase attempt. Records are never deleted; `reference` is unique
/// and doubles as the idempotency key for gateway verification.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticket_id: Uuid,
    pub email: String,
    /// Amount charged at checkout, major units.
    pub amount: Decimal,
    pub reference: String,
    #[sqlx(try_from = "String")]
    pub status: PaymentStatus,
    /// Amount the gateway confirmed, set once the payment settles.
    pub settled_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    pub fn pending(user_id: Uuid, ticket_id: Uuid, email: String, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            ticket_id,
            email,
            amount,
            reference: Uuid::new_v4().to_string(),
            status: PaymentStatus::Pending,
            settled_amount: None,
            created_at: Utc::now(),
            paid_at: None,
        }
    }

    pub fn summary(&self) -> PaymentSummary {
        PaymentSummary {
            payment_id: self.id,
            reference: self.reference.clone(),
            amount_paid: self.amount,
            payment_date: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_records_get_distinct_references() {
        let user = Uuid::new_v4();
        let ticket = Uuid::new_v4();
        let a = PaymentRecord::pending(user, ticket, "a@example.com".into(), Decimal::ONE);
        let b = PaymentRecord::pending(user, ticket, "a@example.com".into(), Decimal::ONE);

        assert_ne!(a.reference, b.reference);
        assert_eq!(a.status, PaymentStatus::Pending);
        assert!(a.paid_at.is_none());
    }

    #[test]
    fn test_summary_mirrors_the_record() {
        let record = PaymentRecord::pending(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "buyer@example.com".into(),
            Decimal::new(1000, 0),
        );
        let summary = record.summary();
        assert_eq!(summary.payment_id, record.id);
        assert_eq!(summary.reference, record.reference);
        assert_eq!(summary.amount_paid, Decimal::new(1000, 0));
    }
}
