//! Payment provider boundary.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

pub mod mock;
pub mod paystack;

pub use mock::MockGateway;
pub use paystack::PaystackGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected gateway response: {0}")]
    MalformedResponse(String),

    #[error("amount {0} cannot be expressed in minor units")]
    InvalidAmount(Decimal),
}

impl GatewayError {
    /// True when the provider (or our own pre-check) refused the request,
    /// as opposed to the call itself failing.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            GatewayError::Rejected { .. } | GatewayError::InvalidAmount(_)
        )
    }

    pub fn provider_message(&self) -> Option<&str> {
        match self {
            GatewayError::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest<'a> {
    /// Total to charge, major units.
    pub amount: Decimal,
    pub email: &'a str,
    pub reference: &'a str,
    pub callback_url: &'a str,
}

/// The provider's account of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub status: String,
    pub amount_minor: i64,
    pub customer_email: String,
}

impl Verification {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    pub fn amount_major(&self) -> Decimal {
        Decimal::new(self.amount_minor, 2)
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a hosted checkout and returns the URL the buyer pays on.
    async fn create_checkout(&self, request: CheckoutRequest<'_>) -> Result<String, GatewayError>;

    async fn verify(&self, reference: &str) -> Result<Verification, GatewayError>;
}

/// Converts major units to the provider's minor units (x100). Amounts with
/// sub-minor precision are refused rather than rounded.
pub fn to_minor_units(amount: Decimal) -> Result<i64, GatewayError> {
    let minor = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or(GatewayError::InvalidAmount(amount))?;
    if minor.is_sign_negative() || !minor.fract().is_zero() {
        return Err(GatewayError::InvalidAmount(amount));
    }
    minor.to_i64().ok_or(GatewayError::InvalidAmount(amount))
}
