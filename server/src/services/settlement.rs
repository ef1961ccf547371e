//! Two-step ticket purchase: checkout, then gateway-verified settlement.

use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::gateway::{CheckoutRequest, PaymentGateway};
use crate::models::{Event, PaymentRecord, PaymentStatus, QuantityInput, Ticket, User};
use crate::notify::{receipt, Notifier};
use crate::store::{Decrement, Settlement, SettlementOutcome, Store};
use crate::utils::error::AppError;

#[derive(Debug, Serialize)]
pub struct PurchaseIntent {
    pub authorization_url: String,
    pub reference: String,
    pub payment: PaymentRecord,
}

#[derive(Debug, Serialize)]
pub struct SettlementReceipt {
    pub reference: String,
    pub number_of_tickets: i32,
    pub amount_paid: Decimal,
    pub remaining_quantity: i32,
    /// The purchase took the last unit. Informational; the settlement succeeded.
    pub sold_out: bool,
    /// The reference had already been settled by an earlier call.
    pub already_settled: bool,
    pub event: Event,
}

#[derive(Debug, Serialize)]
pub struct FreeTicketIssue {
    pub ticket: Ticket,
    pub event: Event,
}

pub struct SettlementService {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Notifier,
    callback_url: String,
}

/// Whole tickets covered by `amount`. Any remainder is revenue but buys nothing.
fn quantity_paid(amount: Decimal, price: Decimal) -> Result<i32, AppError> {
    if price <= Decimal::ZERO {
        return Err(AppError::Internal(format!("ticket has non-positive price {price}")));
    }
    amount
        .checked_div(price)
        .and_then(|q| q.floor().to_i32())
        .filter(|q| *q > 0)
        .ok_or_else(|| {
            AppError::PaymentNotVerified(format!("amount {amount} does not cover a single ticket"))
        })
}

fn require_email(email: &str) -> Result<&str, AppError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::InvalidInput(
            "A valid email address is required".to_string(),
        ));
    }
    Ok(email)
}

fn priced(ticket: &Ticket) -> Result<Decimal, AppError> {
    ticket.price.ok_or_else(|| {
        AppError::InvalidInput(
            "This ticket is free. Request it through the free ticket endpoint.".to_string(),
        )
    })
}

impl SettlementService {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Notifier,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
            callback_url: callback_url.into(),
        }
    }

    async fn ticket(&self, id: Uuid) -> Result<Ticket, AppError> {
        self.store
            .find_ticket(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))
    }

    async fn event(&self, id: Uuid) -> Result<Event, AppError> {
        self.store
            .find_event(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }

    pub async fn initiate_purchase(
        &self,
        ticket_id: Uuid,
        buyer: &User,
        quantity: &QuantityInput,
        email: &str,
    ) -> Result<PurchaseIntent, AppError> {
        let quantity = quantity
            .resolve()
            .ok_or_else(|| AppError::InvalidInput("Invalid quantity".to_string()))?;
        let email = require_email(email)?;

        let ticket = self.ticket(ticket_id).await?;
        let price = priced(&ticket)?;
        if ticket.remaining_quantity < quantity {
            return Err(AppError::InsufficientInventory {
                requested: quantity,
                remaining: ticket.remaining_quantity,
            });
        }

        let total = price
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(|| AppError::InvalidInput("Order total is too large".to_string()))?;

        let payment = PaymentRecord::pending(buyer.id, ticket.id, email.to_string(), total);
        self.store.record_payment_attempt(&payment).await?;

        let checkout = self
            .gateway
            .create_checkout(CheckoutRequest {
                amount: total,
                email,
                reference: &payment.reference,
                callback_url: &self.callback_url,
            })
            .await;

        let authorization_url = match checkout {
            Ok(url) => url,
            Err(e) => {
                if let Err(mark) = self.store.mark_payment_failed(&payment.reference).await {
                    error!(reference = %payment.reference, error = ?mark, "Could not mark payment failed");
                }
                return Err(e.into());
            }
        };

        info!(
            ticket_id = %ticket.id,
            reference = %payment.reference,
            quantity,
            amount = %total,
            "Purchase initiated"
        );

        Ok(PurchaseIntent {
            authorization_url,
            reference: payment.reference.clone(),
            payment,
        })
    }

    pub async fn confirm_purchase(
        &self,
        ticket_id: Uuid,
        reference: &str,
    ) -> Result<SettlementReceipt, AppError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(AppError::InvalidInput(
                "Payment reference is required".to_string(),
            ));
        }

        let ticket = self.ticket(ticket_id).await?;
        let record = self
            .store
            .find_payment(reference)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;
        if record.ticket_id != ticket.id {
            return Err(AppError::InvalidInput(
                "Payment reference does not belong to this ticket".to_string(),
            ));
        }
        let price = priced(&ticket)?;

        if record.status == PaymentStatus::Confirmed {
            return self.replay(&ticket, &record, price).await;
        }

        let verification = self.gateway.verify(reference).await?;
        if !verification.is_success() {
            self.store.mark_payment_failed(reference).await?;
            warn!(reference, status = %verification.status, "Payment not successful");
            return Err(AppError::PaymentNotVerified(verification.status));
        }

        let amount = verification.amount_major();
        let quantity = quantity_paid(amount, price)?;
        if amount != record.amount {
            warn!(
                reference,
                charged = %record.amount,
                paid = %amount,
                "Gateway amount differs from checkout amount"
            );
        }

        let outcome = self
            .store
            .settle(&Settlement {
                reference: reference.to_string(),
                ticket_id: ticket.id,
                quantity,
                amount,
            })
            .await?;

        let remaining = match outcome {
            SettlementOutcome::Settled { remaining, .. } => remaining,
            SettlementOutcome::AlreadySettled { .. } => {
                // Lost a race against a concurrent confirmation of the same reference.
                let record = self.store.find_payment(reference).await?.unwrap_or(record);
                return self.replay(&ticket, &record, price).await;
            }
            SettlementOutcome::Insufficient { remaining } => {
                error!(
                    reference,
                    requested = quantity,
                    remaining,
                    "Verified payment exceeds remaining stock"
                );
                return Err(AppError::InsufficientInventory {
                    requested: quantity,
                    remaining,
                });
            }
            SettlementOutcome::UnknownReference => {
                return Err(AppError::NotFound("Payment not found".to_string()))
            }
            SettlementOutcome::MissingTicket => {
                return Err(AppError::NotFound("Ticket not found".to_string()))
            }
        };

        let sold_out = remaining == 0;
        info!(reference, quantity, remaining, amount = %amount, "Payment settled");
        if sold_out {
            info!(ticket_id = %ticket.id, "Ticket sold out");
        }

        let event = self.event(ticket.event_id).await?;
        let recipient = if verification.customer_email.trim().is_empty() {
            record.email.as_str()
        } else {
            verification.customer_email.as_str()
        };
        self.notifier
            .notify(receipt::purchase_receipt(recipient, &event, quantity));

        Ok(SettlementReceipt {
            reference: reference.to_string(),
            number_of_tickets: quantity,
            amount_paid: amount,
            remaining_quantity: remaining,
            sold_out,
            already_settled: false,
            event,
        })
    }

    /// Reports a settlement that an earlier call already applied.
    async fn replay(
        &self,
        ticket: &Ticket,
        record: &PaymentRecord,
        price: Decimal,
    ) -> Result<SettlementReceipt, AppError> {
        let amount = record.settled_amount.unwrap_or(record.amount);
        let current = self.ticket(ticket.id).await?;
        let event = self.event(ticket.event_id).await?;
        info!(reference = %record.reference, "Payment already settled");
        Ok(SettlementReceipt {
            reference: record.reference.clone(),
            number_of_tickets: quantity_paid(amount, price)?,
            amount_paid: amount,
            remaining_quantity: current.remaining_quantity,
            sold_out: current.remaining_quantity == 0,
            already_settled: true,
            event,
        })
    }

    /// Issues one unit of an unpriced ticket. Free issuance consumes stock
    /// just like a paid purchase.
    pub async fn issue_free_ticket(
        &self,
        ticket_id: Uuid,
        email: &str,
    ) -> Result<FreeTicketIssue, AppError> {
        let email = require_email(email)?;
        let mut ticket = self.ticket(ticket_id).await?;

        if ticket.remaining_quantity < 1 {
            return Err(AppError::InsufficientInventory {
                requested: 1,
                remaining: ticket.remaining_quantity,
            });
        }
        if !ticket.is_free() {
            return Err(AppError::NotFree);
        }

        ticket.remaining_quantity = match self.store.decrement_quantity(ticket.id, 1).await? {
            Decrement::Applied { remaining } => remaining,
            Decrement::Insufficient { remaining } => {
                return Err(AppError::InsufficientInventory {
                    requested: 1,
                    remaining,
                })
            }
            Decrement::Missing => return Err(AppError::NotFound("Ticket not found".to_string())),
        };

        let event = self.event(ticket.event_id).await?;
        info!(ticket_id = %ticket.id, remaining = ticket.remaining_quantity, "Free ticket issued");
        self.notifier.notify(receipt::free_ticket(email, &event));

        Ok(FreeTicketIssue { ticket, event })
    }
}
