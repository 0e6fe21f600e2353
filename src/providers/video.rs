//! VdoCipher playback OTPs.

use async_trait::async_trait;
use serde_json::json;

use super::{check, ProviderError, VideoOtpProvider};

const API_BASE: &str = "https://dev.vdocipher.com/api";

/// Seconds an OTP stays valid.
const OTP_TTL_SECS: u64 = 300;

pub struct VdoCipherClient {
    http: reqwest::Client,
    api_secret: String,
}

impl VdoCipherClient {
    pub fn new(http: reqwest::Client, api_secret: String) -> Self {
        Self { http, api_secret }
    }
}

#[async_trait]
impl VideoOtpProvider for VdoCipherClient {
    async fn otp(&self, video_id: &str) -> Result<serde_json::Value, ProviderError> {
        let response = self
            .http
            .post(format!("{API_BASE}/videos/{video_id}/otp"))
            .header("Accept", "application/json")
            .header("Authorization", format!("Apisecret {}", self.api_secret))
            .json(&json!({ "ttl": OTP_TTL_SECS }))
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }
}
