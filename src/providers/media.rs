//! Cloudinary image uploads.

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{check, MediaStore, ProviderError};
use crate::config::CloudinaryConfig;
use crate::models::MediaRef;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

pub struct CloudinaryClient {
    http: reqwest::Client,
    config: CloudinaryConfig,
}

#[derive(Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
}

impl CloudinaryClient {
    pub fn new(http: reqwest::Client, config: CloudinaryConfig) -> Self {
        Self { http, config }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", API_BASE, self.config.cloud_name, action)
    }

    /// Signed form for an authenticated API call. `params` are the parameters covered by the
    /// signature; `file` is sent alongside unsigned.
    fn signed_form(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        params.push(("timestamp", chrono::Utc::now().timestamp().to_string()));
        let signature = sign(&params, &self.config.api_secret);
        params.push(("api_key", self.config.api_key.clone()));
        params.push(("signature", signature));
        params.push(("signature_algorithm", "sha256".to_string()));
        params
    }
}

/// SHA-256 over the alphabetically sorted `key=value` pairs joined with `&`, followed by the
/// API secret.
fn sign(params: &[(&str, String)], secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha256::digest(format!("{joined}{secret}").as_bytes()))
}

#[async_trait]
impl MediaStore for CloudinaryClient {
    async fn upload(&self, payload: &str, folder: &str) -> Result<MediaRef, ProviderError> {
        let mut form = self.signed_form(vec![("folder", folder.to_string())]);
        form.push(("file", payload.to_string()));

        let response = self
            .http
            .post(self.endpoint("upload"))
            .form(&form)
            .send()
            .await?;
        let uploaded: UploadResponse = check(response).await?.json().await?;

        tracing::info!(public_id = %uploaded.public_id, folder, "Image uploaded");
        Ok(MediaRef {
            public_id: uploaded.public_id,
            url: uploaded.secure_url,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), ProviderError> {
        let form = self.signed_form(vec![("public_id", public_id.to_string())]);

        let response = self
            .http
            .post(self.endpoint("destroy"))
            .form(&form)
            .send()
            .await?;
        check(response).await?;

        tracing::info!(public_id, "Image destroyed");
        Ok(())
    }
}
