//! Site layout API endpoints: banner, FAQ and categories.

use axum::{extract::State, http::StatusCode};
use serde::Serialize;

use super::{ApiJson, ApiPath, ApiResponse, ApiResult, MessageBody};
use crate::auth::AdminUser;
use crate::cache::{Source, LAYOUT_TTL};
use crate::db::now;
use crate::errors::AppError;
use crate::models::{
    is_hosted_url, Banner, Category, FaqItem, Layout, LayoutContent, LayoutKind, LayoutRequest,
};
use crate::AppState;

/// Media host folder for banner images.
const LAYOUT_FOLDER: &str = "layout";

#[derive(Debug, Serialize)]
pub struct LayoutBody {
    pub layout: Layout,
}

/// POST /create-layout - Create the single layout document of a type (admin).
pub async fn create_layout(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiJson(request): ApiJson<LayoutRequest>,
) -> ApiResult<MessageBody> {
    let kind = request.kind();
    if state.repo.get_layout(kind).await?.is_some() {
        return Err(AppError::BadRequest(format!(
            "{} already exist",
            kind.as_str()
        )));
    }

    let content = match request {
        LayoutRequest::Banner {
            image,
            title,
            sub_title,
        } => {
            require_image(&image)?;
            LayoutContent::Banner {
                banner: Banner {
                    image: state.media.upload(&image, LAYOUT_FOLDER).await?,
                    title,
                    sub_title,
                },
            }
        }
        LayoutRequest::Faq { faq } => {
            validate_faq(&faq)?;
            LayoutContent::Faq { faq }
        }
        LayoutRequest::Categories { categories } => {
            validate_categories(&categories)?;
            LayoutContent::Categories { categories }
        }
    };

    let now = now();
    let layout = Layout {
        id: uuid::Uuid::new_v4().to_string(),
        content,
        created_at: now.clone(),
        updated_at: now,
    };
    state.repo.insert_layout(&layout).await?;
    state.cache.invalidate(&[kind.cache_key()]).await;

    tracing::info!(kind = kind.as_str(), "Layout created");
    Ok(ApiResponse::ok(MessageBody::new(
        "Layout created successfully",
    )))
}

/// PUT /edit-layout - Replace the layout document of a type (admin).
pub async fn edit_layout(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiJson(request): ApiJson<LayoutRequest>,
) -> ApiResult<MessageBody> {
    let kind = request.kind();
    let mut layout = state
        .repo
        .get_layout(kind)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} layout not found", kind.as_str())))?;

    layout.content = match (request, layout.content) {
        (
            LayoutRequest::Banner {
                image,
                title,
                sub_title,
            },
            LayoutContent::Banner { banner: current },
        ) => {
            require_image(&image)?;
            let image = if is_hosted_url(&image) {
                current.image
            } else {
                state.media.destroy(&current.image.public_id).await?;
                state.media.upload(&image, LAYOUT_FOLDER).await?
            };
            LayoutContent::Banner {
                banner: Banner {
                    image,
                    title,
                    sub_title,
                },
            }
        }
        (LayoutRequest::Faq { faq }, _) => {
            validate_faq(&faq)?;
            LayoutContent::Faq { faq }
        }
        (LayoutRequest::Categories { categories }, _) => {
            validate_categories(&categories)?;
            LayoutContent::Categories { categories }
        }
        (LayoutRequest::Banner { .. }, _) => {
            return Err(AppError::Internal(
                "Stored Banner layout has a different shape".to_string(),
            ));
        }
    };
    layout.updated_at = now();

    state.repo.update_layout(&layout).await?;
    state.cache.invalidate(&[kind.cache_key()]).await;

    tracing::info!(kind = kind.as_str(), "Layout updated");
    Ok(ApiResponse::ok(MessageBody::new(
        "Layout Updated successfully",
    )))
}

/// GET /get-layout/{type} - Layout document by type, cache first. Answers 201 when it was read
/// from the store and 200 when served from the cache.
pub async fn get_layout_by_type(
    State(state): State<AppState>,
    ApiPath(raw_kind): ApiPath<String>,
) -> ApiResult<LayoutBody> {
    let kind = LayoutKind::parse(&raw_kind)
        .ok_or_else(|| AppError::BadRequest("Invalid layout type".to_string()))?;
    let repo = &state.repo;

    let fetched = state
        .cache
        .fetch(kind.cache_key(), LAYOUT_TTL, || repo.get_layout(kind))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} layout not found", kind.as_str())))?;

    let status = match fetched.source {
        Source::Store => StatusCode::CREATED,
        Source::Cache => StatusCode::OK,
    };
    Ok(ApiResponse::with_status(
        status,
        LayoutBody {
            layout: fetched.value,
        },
    ))
}

fn require_image(image: &str) -> Result<(), AppError> {
    if image.trim().is_empty() {
        return Err(AppError::Validation("Banner image is required".to_string()));
    }
    Ok(())
}

fn validate_faq(faq: &[FaqItem]) -> Result<(), AppError> {
    if faq
        .iter()
        .any(|item| item.question.trim().is_empty() || item.answer.trim().is_empty())
    {
        return Err(AppError::Validation(
            "Every FAQ entry needs a question and an answer".to_string(),
        ));
    }
    Ok(())
}

fn validate_categories(categories: &[Category]) -> Result<(), AppError> {
    if categories.iter().any(|c| c.title.trim().is_empty()) {
        return Err(AppError::Validation(
            "Category title is required".to_string(),
        ));
    }
    Ok(())
}
