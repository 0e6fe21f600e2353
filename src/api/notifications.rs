//! Notification API endpoints (admin).

use axum::extract::State;
use serde::Serialize;

use super::{ApiPath, ApiResponse, ApiResult};
use crate::auth::AdminUser;
use crate::errors::{parse_id, AppError};
use crate::models::Notification;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct NotificationsBody {
    pub notifications: Vec<Notification>,
}

/// GET /get-notifications - All notifications, newest first.
pub async fn get_notifications(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<NotificationsBody> {
    let notifications = state.repo.list_notifications().await?;
    Ok(ApiResponse::created(NotificationsBody { notifications }))
}

/// PUT /update-notification/{id} - Mark a notification read and return the refreshed list.
pub async fn update_notification(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiPath(raw_id): ApiPath<String>,
) -> ApiResult<NotificationsBody> {
    let id = parse_id(&raw_id, "id")?;

    if !state.repo.mark_notification_read(&id).await? {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }

    let notifications = state.repo.list_notifications().await?;
    Ok(ApiResponse::created(NotificationsBody { notifications }))
}
