//! Stripe payment intents.

use async_trait::async_trait;
use serde::Deserialize;

use super::{check, PaymentGateway, ProviderError};

const API_BASE: &str = "https://api.stripe.com/v1";

pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
}

#[derive(Deserialize)]
struct PaymentIntent {
    status: String,
    #[serde(default)]
    client_secret: Option<String>,
}

impl StripeClient {
    pub fn new(http: reqwest::Client, secret_key: String) -> Self {
        Self { http, secret_key }
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn payment_status(&self, intent_id: &str) -> Result<String, ProviderError> {
        let response = self
            .http
            .get(format!("{API_BASE}/payment_intents/{intent_id}"))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        let intent: PaymentIntent = check(response).await?.json().await?;
        Ok(intent.status)
    }

    async fn create_payment_intent(&self, amount: u64) -> Result<String, ProviderError> {
        let form = [
            ("amount", amount.to_string()),
            ("currency", "usd".to_string()),
            ("description", "LearnHub course purchase".to_string()),
            ("metadata[company]", "LearnHub".to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];

        let response = self
            .http
            .post(format!("{API_BASE}/payment_intents"))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;
        let intent: PaymentIntent = check(response).await?.json().await?;

        intent.client_secret.ok_or_else(|| ProviderError::Rejected {
            status: 200,
            body: "payment intent has no client secret".to_string(),
        })
    }
}
