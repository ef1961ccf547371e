use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{to_minor_units, CheckoutRequest, GatewayError, PaymentGateway, Verification};

const FALLBACK_ERROR: &str = "Failed to reach the payment gateway";

/// Paystack transaction API client.
#[derive(Clone)]
pub struct PaystackGateway {
    client: Client,
    base_url: String,
    secret_key: String,
}

#[derive(Serialize)]
struct InitializeBody<'a> {
    amount: i64,
    email: &'a str,
    reference: &'a str,
    callback_url: &'a str,
}

#[derive(Deserialize)]
struct Envelope<T> {
    message: String,
    data: Option<T>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    amount: i64,
    customer: Customer,
}

#[derive(Debug, Deserialize)]
struct Customer {
    email: String,
}

impl PaystackGateway {
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }

    async fn read<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = request.bearer_auth(&self.secret_key).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        parse_envelope(status, &body)
    }
}

/// Unwraps Paystack's `{status, message, data}` envelope. Non-2xx replies
/// become [`GatewayError::Rejected`] carrying the provider's message.
fn parse_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, GatewayError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.message)
            .unwrap_or_else(|_| FALLBACK_ERROR.to_string());
        return Err(GatewayError::Rejected { status, message });
    }

    let envelope: Envelope<T> = serde_json::from_str(body)
        .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
    envelope
        .data
        .ok_or(GatewayError::MalformedResponse(envelope.message))
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn create_checkout(&self, request: CheckoutRequest<'_>) -> Result<String, GatewayError> {
        let body = InitializeBody {
            amount: to_minor_units(request.amount)?,
            email: request.email,
            reference: request.reference,
            callback_url: request.callback_url,
        };
        debug!(reference = request.reference, amount_minor = body.amount, "Initializing checkout");

        let data: InitializeData = self
            .read(
                self.client
                    .post(format!("{}/transaction/initialize", self.base_url))
                    .json(&body),
            )
            .await?;
        Ok(data.authorization_url)
    }

    async fn verify(&self, reference: &str) -> Result<Verification, GatewayError> {
        debug!(reference, "Verifying transaction");
        let data: VerifyData = self
            .read(
                self.client
                    .get(format!("{}/transaction/verify/{}", self.base_url, reference)),
            )
            .await?;
        Ok(Verification {
            status: data.status,
            amount_minor: data.amount,
            customer_email: data.customer.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_initialize_reply() {
        let body = r#"{
            "status": true,
            "message": "Authorization URL created",
            "data": {
                "authorization_url": "https://checkout.paystack.com/abc123",
                "access_code": "abc123",
                "reference": "ref-1"
            }
        }"#;
        let data: InitializeData = parse_envelope(200, body).unwrap();
        assert_eq!(data.authorization_url, "https://checkout.paystack.com/abc123");
    }

    #[test]
    fn test_parses_verify_reply() {
        let body = r#"{
            "status": true,
            "message": "Verification successful",
            "data": {
                "status": "success",
                "amount": 100000,
                "reference": "ref-1",
                "customer": { "id": 7, "email": "buyer@example.com" }
            }
        }"#;
        let data: VerifyData = parse_envelope(200, body).unwrap();
        assert_eq!(data.status, "success");
        assert_eq!(data.amount, 100_000);
        assert_eq!(data.customer.email, "buyer@example.com");
    }

    #[test]
    fn test_non_2xx_carries_provider_message() {
        let body = r#"{"status": false, "message": "Invalid key"}"#;
        let err = parse_envelope::<InitializeData>(401, body).unwrap_err();
        match err {
            GatewayError::Rejected { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unreadable_error_body_falls_back() {
        let err = parse_envelope::<InitializeData>(502, "<html>bad gateway</html>").unwrap_err();
        assert_eq!(err.provider_message(), Some(FALLBACK_ERROR));
    }

    #[test]
    fn test_missing_data_is_malformed() {
        let body = r#"{"status": true, "message": "nothing here"}"#;
        let err = parse_envelope::<VerifyData>(200, body).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse(m) if m == "nothing here"));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let gateway = PaystackGateway::new("https://api.paystack.co/", "sk_test");
        assert_eq!(gateway.base_url, "https://api.paystack.co");
    }
}
