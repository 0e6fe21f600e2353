//! REST API module.
//!
//! Handlers answer `{ success: true, ...payload }` on success; failures go through
//! [`AppError`](crate::errors::AppError) and answer `{ success: false, message }`.

mod courses;
mod layouts;
mod live;
mod notifications;
mod orders;

pub use courses::*;
pub use layouts::*;
pub use live::*;
pub use notifications::*;
pub use orders::*;

use axum::{
    extract::{FromRequest, FromRequestParts},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;

/// Success response envelope.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    status: StatusCode,
    payload: T,
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    success: bool,
    #[serde(flatten)]
    payload: &'a T,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK.
    pub fn ok(payload: T) -> Self {
        Self::with_status(StatusCode::OK, payload)
    }

    /// 201 Created.
    pub fn created(payload: T) -> Self {
        Self::with_status(StatusCode::CREATED, payload)
    }

    pub fn with_status(status: StatusCode, payload: T) -> Self {
        Self { status, payload }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            success: true,
            payload: &self.payload,
        };
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// JSON body extractor whose rejections use the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections use the error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Payload carrying only a human-readable message.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// GET /test - Liveness probe.
pub async fn test_endpoint() -> ApiResponse<MessageBody> {
    ApiResponse::ok(MessageBody::new("API is working"))
}

/// Fallback for unknown routes.
pub async fn route_not_found(uri: axum::http::Uri) -> AppError {
    AppError::NotFound(format!("Route {} not found", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct CourseBody {
        course: &'static str,
    }

    #[tokio::test]
    async fn test_envelope_flattens_payload() {
        let response = ApiResponse::created(CourseBody { course: "c1" }).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, serde_json::json!({ "success": true, "course": "c1" }));
    }
}
