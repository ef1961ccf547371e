//! Scripted gateway for exercising the workflow without a provider.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use super::{to_minor_units, CheckoutRequest, GatewayError, PaymentGateway, Verification};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCheckout {
    pub amount: Decimal,
    pub amount_minor: i64,
    pub email: String,
    pub reference: String,
    pub callback_url: String,
}

#[derive(Default)]
pub struct MockGateway {
    verification: Mutex<Option<Verification>>,
    checkout_rejection: Mutex<Option<String>>,
    checkouts: Mutex<Vec<RecordedCheckout>>,
    verifications: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later `verify` reports this transaction.
    pub async fn set_verification(&self, status: &str, amount_minor: i64, email: &str) {
        *self.verification.lock().await = Some(Verification {
            status: status.to_string(),
            amount_minor,
            customer_email: email.to_string(),
        });
    }

    /// Every later `create_checkout` fails with a provider rejection.
    pub async fn reject_checkouts(&self, message: &str) {
        *self.checkout_rejection.lock().await = Some(message.to_string());
    }

    pub async fn checkouts(&self) -> Vec<RecordedCheckout> {
        self.checkouts.lock().await.clone()
    }

    /// References passed to `verify`, in call order.
    pub async fn verified_references(&self) -> Vec<String> {
        self.verifications.lock().await.clone()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_checkout(&self, request: CheckoutRequest<'_>) -> Result<String, GatewayError> {
        if let Some(message) = self.checkout_rejection.lock().await.clone() {
            return Err(GatewayError::Rejected {
                status: 400,
                message,
            });
        }
        let amount_minor = to_minor_units(request.amount)?;
        self.checkouts.lock().await.push(RecordedCheckout {
            amount: request.amount,
            amount_minor,
            email: request.email.to_string(),
            reference: request.reference.to_string(),
            callback_url: request.callback_url.to_string(),
        });
        Ok(format!("https://checkout.test/{}", request.reference))
    }

    async fn verify(&self, reference: &str) -> Result<Verification, GatewayError> {
        self.verifications.lock().await.push(reference.to_string());
        self.verification
            .lock()
            .await
            .clone()
            .ok_or_else(|| GatewayError::Rejected {
                status: 404,
                message: "Transaction reference not found".to_string(),
            })
    }
}
