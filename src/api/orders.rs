//! Order and payment API endpoints.

use axum::extract::State;
use chrono::Utc;
use serde::Serialize;

use super::{ApiJson, ApiResponse, ApiResult};
use crate::auth::{AdminUser, CurrentUser};
use crate::cache::{ALL_COURSES_KEY, USER_TTL};
use crate::db::NewPurchase;
use crate::errors::{parse_id, AppError};
use crate::mail::OrderSummary;
use crate::models::{CreateOrderRequest, NewPaymentRequest, Order};
use crate::notify::messages;
use crate::AppState;

/// Payment intent status that allows an order.
const PAYMENT_SUCCEEDED: &str = "succeeded";

#[derive(Debug, Serialize)]
pub struct OrderBody {
    pub order: Order,
}

#[derive(Debug, Serialize)]
pub struct OrdersBody {
    pub orders: Vec<Order>,
}

#[derive(Debug, Serialize)]
pub struct PublishableKeyBody {
    pub publishablekey: String,
}

#[derive(Debug, Serialize)]
pub struct ClientSecretBody {
    pub client_secret: String,
}

/// POST /create-order - Record the purchase of a course.
pub async fn create_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<CreateOrderRequest>,
) -> ApiResult<OrderBody> {
    let course_id = parse_id(&request.course_id, "courseId")?;

    if let Some(intent_id) = Order::payment_intent_id(request.payment_info.as_ref()) {
        let status = state.payments.payment_status(intent_id).await?;
        if status != PAYMENT_SUCCEEDED {
            tracing::warn!(intent_id, status = %status, user = %user.id, "Payment not authorized");
            return Err(AppError::BadRequest("Payment not authorized!".to_string()));
        }
    }

    if state.repo.user_owns_course(&user.id, &course_id).await? {
        return Err(AppError::BadRequest(
            "You have already purchased this course".to_string(),
        ));
    }

    let course = state
        .repo
        .get_course(&course_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

    let email = state
        .mail
        .order_confirmation(&user.email, &OrderSummary::new(&course, Utc::now()))?;
    let notification = messages::order_placed(&user.id, &course.name);

    let order = state
        .repo
        .complete_purchase(NewPurchase {
            user_id: &user.id,
            course_id: &course_id,
            payment_info: request.payment_info,
            notification: &notification,
            email: Some(&email),
        })
        .await?;

    if let Some(owner) = state.repo.get_user(&user.id).await? {
        state.cache.put(&owner.id, &owner, USER_TTL).await;
    }
    state
        .cache
        .invalidate(&[course_id.as_str(), ALL_COURSES_KEY])
        .await;
    state.hub.publish_notification(&notification);

    tracing::info!(order_id = %order.id, course_id = %course_id, user = %user.id, "Order created");
    Ok(ApiResponse::ok(OrderBody { order }))
}

/// GET /get-orders - Every order, newest first (admin).
pub async fn get_all_orders(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<OrdersBody> {
    let orders = state.repo.list_orders().await?;
    Ok(ApiResponse::created(OrdersBody { orders }))
}

/// GET /payment/stripepublishablekey - Key for the client-side payment form.
pub async fn send_publishable_key(State(state): State<AppState>) -> ApiResult<PublishableKeyBody> {
    let stripe = state
        .config
        .stripe
        .as_ref()
        .ok_or_else(|| AppError::External("Payment processor is not configured".to_string()))?;

    Ok(ApiResponse::ok(PublishableKeyBody {
        publishablekey: stripe.publishable_key.clone(),
    }))
}

/// POST /payment - Create a payment intent.
pub async fn new_payment(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    ApiJson(request): ApiJson<NewPaymentRequest>,
) -> ApiResult<ClientSecretBody> {
    if request.amount == 0 {
        return Err(AppError::Validation("Amount must be positive".to_string()));
    }

    let client_secret = state.payments.create_payment_intent(request.amount).await?;
    Ok(ApiResponse::created(ClientSecretBody { client_secret }))
}
