//! Site layout documents: one per kind (Banner, FAQ, Categories).

use serde::{Deserialize, Serialize};

use super::MediaRef;

/// Layout discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    Banner,
    Faq,
    Categories,
}

impl LayoutKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutKind::Banner => "Banner",
            LayoutKind::Faq => "FAQ",
            LayoutKind::Categories => "Categories",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Banner" => Some(LayoutKind::Banner),
            "FAQ" => Some(LayoutKind::Faq),
            "Categories" => Some(LayoutKind::Categories),
            _ => None,
        }
    }

    /// Well-known cache key for this layout.
    pub fn cache_key(&self) -> &'static str {
        match self {
            LayoutKind::Banner => "Banner",
            LayoutKind::Faq => "faq",
            LayoutKind::Categories => "Categories",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub image: MediaRef,
    pub title: String,
    pub sub_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub title: String,
}

/// Kind-specific attributes; the shapes are disjoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum LayoutContent {
    Banner { banner: Banner },
    #[serde(rename = "FAQ")]
    Faq { faq: Vec<FaqItem> },
    Categories { categories: Vec<Category> },
}

impl LayoutContent {
    pub fn kind(&self) -> LayoutKind {
        match self {
            LayoutContent::Banner { .. } => LayoutKind::Banner,
            LayoutContent::Faq { .. } => LayoutKind::Faq,
            LayoutContent::Categories { .. } => LayoutKind::Categories,
        }
    }
}

/// Stored layout document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub id: String,
    #[serde(flatten)]
    pub content: LayoutContent,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for `POST /create-layout` and `PUT /edit-layout`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum LayoutRequest {
    Banner {
        /// Data URI to upload, or the current hosted URL to keep the image
        image: String,
        title: String,
        #[serde(rename = "subTitle")]
        sub_title: String,
    },
    #[serde(rename = "FAQ")]
    Faq { faq: Vec<FaqItem> },
    Categories { categories: Vec<Category> },
}

impl LayoutRequest {
    pub fn kind(&self) -> LayoutKind {
        match self {
            LayoutRequest::Banner { .. } => LayoutKind::Banner,
            LayoutRequest::Faq { .. } => LayoutKind::Faq,
            LayoutRequest::Categories { .. } => LayoutKind::Categories,
        }
    }
}
