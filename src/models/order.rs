//! Order model.

use serde::{Deserialize, Serialize};

/// A completed course purchase. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub course_id: String,
    pub user_id: String,
    /// Payment confirmation payload as received from the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_info: Option<serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
}

impl Order {
    /// Payment intent id carried by the confirmation payload, if any.
    pub fn payment_intent_id(payment_info: Option<&serde_json::Value>) -> Option<&str> {
        payment_info?.get("id")?.as_str()
    }
}

/// Request body for `POST /create-order`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub course_id: String,
    #[serde(default)]
    pub payment_info: Option<serde_json::Value>,
}

/// Request body for `POST /payment`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPaymentRequest {
    /// Amount in the smallest currency unit
    pub amount: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payment_intent_id() {
        let info = json!({ "id": "pi_123", "status": "succeeded" });
        assert_eq!(Order::payment_intent_id(Some(&info)), Some("pi_123"));
        assert_eq!(Order::payment_intent_id(Some(&json!({}))), None);
        assert_eq!(Order::payment_intent_id(Some(&json!({ "id": 7 }))), None);
        assert_eq!(Order::payment_intent_id(None), None);
    }
}
