//! Clients for the external SaaS providers: media host, payment processor and video host.
//!
//! Each provider sits behind a trait so handlers can be exercised against fakes. A provider with
//! no credentials is replaced by [`Unconfigured`], which fails every call.

mod media;
mod payment;
mod video;

pub use media::CloudinaryClient;
pub use payment::StripeClient;
pub use video::VdoCipherClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::errors::AppError;
use crate::models::MediaRef;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider answered {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        AppError::External(err.to_string())
    }
}

/// Image hosting.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload an image payload (data URI or remote URL) into `folder`.
    async fn upload(&self, payload: &str, folder: &str) -> Result<MediaRef, ProviderError>;

    async fn destroy(&self, public_id: &str) -> Result<(), ProviderError>;
}

/// Payment processing.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Status of a payment intent, e.g. `succeeded`.
    async fn payment_status(&self, intent_id: &str) -> Result<String, ProviderError>;

    /// Create a payment intent for `amount` cents and return its client secret.
    async fn create_payment_intent(&self, amount: u64) -> Result<String, ProviderError>;
}

/// Protected video playback.
#[async_trait]
pub trait VideoOtpProvider: Send + Sync {
    /// One-time playback credentials, exactly as the provider returns them.
    async fn otp(&self, video_id: &str) -> Result<serde_json::Value, ProviderError>;
}

/// Stand-in for a provider without credentials.
pub struct Unconfigured(pub &'static str);

#[async_trait]
impl MediaStore for Unconfigured {
    async fn upload(&self, _payload: &str, _folder: &str) -> Result<MediaRef, ProviderError> {
        Err(ProviderError::NotConfigured(self.0))
    }

    async fn destroy(&self, _public_id: &str) -> Result<(), ProviderError> {
        Err(ProviderError::NotConfigured(self.0))
    }
}

#[async_trait]
impl PaymentGateway for Unconfigured {
    async fn payment_status(&self, _intent_id: &str) -> Result<String, ProviderError> {
        Err(ProviderError::NotConfigured(self.0))
    }

    async fn create_payment_intent(&self, _amount: u64) -> Result<String, ProviderError> {
        Err(ProviderError::NotConfigured(self.0))
    }
}

#[async_trait]
impl VideoOtpProvider for Unconfigured {
    async fn otp(&self, _video_id: &str) -> Result<serde_json::Value, ProviderError> {
        Err(ProviderError::NotConfigured(self.0))
    }
}

/// Turn a non-2xx answer into [`ProviderError::Rejected`].
async fn check(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Rejected {
        status: status.as_u16(),
        body,
    })
}
