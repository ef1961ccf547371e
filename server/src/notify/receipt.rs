use std::fmt::Write;

use super::Notification;
use crate::models::Event;

const SUBJECT: &str = "Here is your ticket 🚀";

const STYLE: &str = "body { font-family: Arial, sans-serif; background-color: #f0f0f0; } \
.container { max-width: 600px; margin: 0 auto; padding: 20px; background-color: #fff; border-radius: 5px; } \
h1 { color: #007bff; text-align: center; } \
.ticket-details h2 { color: #333; font-size: 16px; margin: 5px 0; } \
.ticket-details p { color: #777; font-size: 14px; margin: 0; } \
.event-image { display: block; width: 100%; border-radius: 5px; margin-bottom: 10px; } \
hr { border: none; border-top: 1px solid #ddd; margin: 20px 0; }";

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn detail(out: &mut String, label: &str, value: &str) {
    let _ = write!(
        out,
        "<div class=\"ticket-details\"><h2>{}:</h2><p>{}</p></div>",
        label,
        escape(value)
    );
}

fn event_block(out: &mut String, event: &Event) {
    if let Some(image) = &event.image {
        let _ = write!(
            out,
            "<img class=\"event-image\" src=\"{}\" alt=\"Event Image\">",
            escape(image)
        );
    }
    detail(out, "Event Name", &event.name);
    detail(out, "Starts", &event.starts_at.format("%Y-%m-%d %H:%M UTC").to_string());
    detail(out, "Ends", &event.ends_at.format("%Y-%m-%d %H:%M UTC").to_string());
    if let Some(venue) = &event.venue {
        detail(out, "Venue", venue);
    }
    out.push_str("<hr>");
}

fn page(heading: &str, lead: &str, body: &str) -> String {
    format!(
        "<html><head><style>{STYLE}</style></head><body><div class=\"container\">\
         <h1>{heading}</h1><p>{lead}</p>{body}</div></body></html>"
    )
}

/// Confirmation for a settled purchase: one block of event details per ticket.
pub fn purchase_receipt(to: &str, event: &Event, quantity: i32) -> Notification {
    let mut blocks = String::new();
    for _ in 0..quantity {
        event_block(&mut blocks, event);
    }
    Notification {
        to: to.to_string(),
        subject: SUBJECT.to_string(),
        html_body: page(
            "Thank you for your payment!",
            &format!("Here are your {quantity} ticket(s) details:"),
            &blocks,
        ),
    }
}

pub fn free_ticket(to: &str, event: &Event) -> Notification {
    let mut block = String::new();
    event_block(&mut block, event);
    Notification {
        to: to.to_string(),
        subject: SUBJECT.to_string(),
        html_body: page(
            "Thank you for registering!",
            "Here are your ticket details:",
            &block,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewEvent, Pricing};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn event() -> Event {
        let now = Utc::now();
        NewEvent {
            title: "Rust & Friends".into(),
            name: "Rust <Meetup>".into(),
            pricing: Pricing::Paid,
            summary: None,
            venue: Some("Hall A".into()),
            image: None,
            starts_at: now,
            ends_at: now + Duration::hours(2),
        }
        .into_event(Uuid::new_v4())
    }

    #[test]
    fn test_receipt_lists_one_block_per_ticket() {
        let notification = purchase_receipt("buyer@example.com", &event(), 2);
        assert_eq!(notification.to, "buyer@example.com");
        assert_eq!(notification.html_body.matches("Event Name:").count(), 2);
        assert!(notification.html_body.contains("Here are your 2 ticket(s)"));
    }

    #[test]
    fn test_event_fields_are_escaped() {
        let notification = free_ticket("buyer@example.com", &event());
        assert!(notification.html_body.contains("Rust &lt;Meetup&gt;"));
        assert!(!notification.html_body.contains("<Meetup>"));
        assert!(notification.html_body.contains("Hall A"));
    }
}
