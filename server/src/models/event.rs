use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pricing {
    Free,
    Paid,
}

text_enum!(Pricing, "pricing", { Free => "free", Paid => "paid" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    #[serde(rename = "Awaiting approval")]
    AwaitingApproval,
    Approved,
    Disapproved,
}

text_enum!(EventStatus, "event status", {
    AwaitingApproval => "awaiting_approval",
    Approved => "approved",
    Disapproved => "disapproved",
});

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub organiser_id: Uuid,
    pub title: String,
    pub name: String,
    pub summary: Option<String>,
    pub venue: Option<String>,
    pub image: Option<String>,
    #[sqlx(try_from = "String")]
    pub pricing: Pricing,
    #[sqlx(try_from = "String")]
    pub status: EventStatus,
    /// Revenue accrued from verified settlements, in major currency units.
    pub amount_gotten: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_free(&self) -> bool {
        self.pricing == Pricing::Free
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub name: String,
    pub pricing: Pricing,
    pub summary: Option<String>,
    pub venue: Option<String>,
    pub image: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl NewEvent {
    pub fn into_event(self, organiser_id: Uuid) -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            organiser_id,
            title: self.title,
            name: self.name,
            summary: self.summary,
            venue: self.venue,
            image: self.image,
            pricing: self.pricing,
            status: EventStatus::AwaitingApproval,
            amount_gotten: Decimal::ZERO,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            created_at: now,
            updated_at: now,
        }
    }
}
