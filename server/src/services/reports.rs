use chrono::{DateTime, Duration, Months, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use crate::models::Event;
use crate::store::Store;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentWindow {
    Today,
    Weekly,
    Monthly,
}

impl PaymentWindow {
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        match raw.map(str::trim) {
            Some("today") => Ok(PaymentWindow::Today),
            Some("weekly") => Ok(PaymentWindow::Weekly),
            Some("monthly") => Ok(PaymentWindow::Monthly),
            _ => Err(AppError::InvalidInput(
                "Invalid filter specified".to_string(),
            )),
        }
    }

    /// Start of the window ending at `now`.
    pub fn since(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            PaymentWindow::Today => {
                Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::default()))
            }
            PaymentWindow::Weekly => now - Duration::days(7),
            PaymentWindow::Monthly => now
                .checked_sub_months(Months::new(1))
                .unwrap_or(now - Duration::days(30)),
        }
    }
}

/// Events that sold at least one ticket inside the window, each listed once.
pub async fn recent_payment_events(
    store: &dyn Store,
    window: PaymentWindow,
    now: DateTime<Utc>,
) -> Result<Vec<Event>, AppError> {
    let tickets = store.tickets_paid_between(window.since(now), now).await?;

    let mut event_ids: Vec<Uuid> = Vec::new();
    for ticket in &tickets {
        if !event_ids.contains(&ticket.event_id) {
            event_ids.push(ticket.event_id);
        }
    }

    Ok(store.find_events(&event_ids).await?)
}
