use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub ticket_type: Option<String>,
    /// Unit price in major currency units. Absent for tickets of free events.
    pub price: Option<Decimal>,
    pub remaining_quantity: i32,
    pub sales_start: DateTime<Utc>,
    pub sales_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub payment_records: Vec<PaymentSummary>,
}

impl Ticket {
    pub fn is_free(&self) -> bool {
        self.price.is_none()
    }
}

/// Entry appended to a ticket every time a purchase is initiated.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct PaymentSummary {
    pub payment_id: Uuid,
    pub reference: String,
    pub amount_paid: Decimal,
    pub payment_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTicket {
    #[serde(rename = "type")]
    pub ticket_type: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: i32,
    pub sales_start: DateTime<Utc>,
    pub sales_end: DateTime<Utc>,
}

impl NewTicket {
    pub fn into_ticket(self, event_id: Uuid) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: Uuid::new_v4(),
            event_id,
            ticket_type: self.ticket_type,
            price: self.price,
            remaining_quantity: self.quantity,
            sales_start: self.sales_start,
            sales_end: self.sales_end,
            created_at: now,
            updated_at: now,
            payment_records: Vec::new(),
        }
    }
}

/// Purchase quantity as clients send it: a JSON number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum QuantityInput {
    Number(f64),
    Text(String),
}

impl QuantityInput {
    /// Returns the quantity when it is a positive whole number.
    pub fn resolve(&self) -> Option<i32> {
        let value = match self {
            QuantityInput::Number(n) => *n,
            QuantityInput::Text(s) => s.trim().parse::<f64>().ok()?,
        };

        if !value.is_finite() || value < 1.0 || value.fract() != 0.0 {
            return None;
        }
        if value > f64::from(i32::MAX) {
            return None;
        }
        Some(value as i32)
    }
}
