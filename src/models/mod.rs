//! Data models for the LearnHub platform.
//!
//! Documents serialize in camelCase to match the web client.

mod course;
mod layout;
mod notification;
mod order;
mod user;

pub use course::*;
pub use layout::*;
pub use notification::*;
pub use order::*;
pub use user::*;

use serde::{Deserialize, Serialize};

/// Reference to an asset held by the media host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub public_id: String,
    pub url: String,
}

/// Author snapshot embedded in reviews, questions and replies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorRef {
    pub id: String,
    pub name: String,
}

/// A payload that already points at a hosted asset is kept as-is instead of re-uploaded.
pub fn is_hosted_url(value: &str) -> bool {
    value.starts_with("https")
}
