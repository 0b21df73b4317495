//! Payment gateway webhook payloads.
//!
//! The gateway posts JSON events to `POST /api/v1/payments/webhook` with an
//! `X-Razorpay-Signature` header carrying `hex(HMAC-SHA256(webhook_secret,
//! raw_body))`. The signature is checked against the raw bytes before the
//! body is parsed.
//!
//! # Example
//!
//! ```json
//! {
//!   "event": "payment.failed",
//!   "payload": {
//!     "payment": {
//!       "entity": {
//!         "id": "pay_29QQoUBi66xm2f",
//!         "order_id": "order_9A33XWu170gUtm",
//!         "method": "upi",
//!         "error_code": "BAD_REQUEST_ERROR",
//!         "error_description": "Payment was declined"
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Webhooks only carry diagnostic metadata; crediting happens exclusively
//! through signed verification.

use serde::Deserialize;

/// Events this service reacts to. Anything else is acknowledged and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    PaymentCaptured,
    PaymentFailed,
    Other(String),
}

impl From<&str> for WebhookEvent {
    fn from(event: &str) -> Self {
        match event {
            "payment.captured" => WebhookEvent::PaymentCaptured,
            "payment.failed" => WebhookEvent::PaymentFailed,
            other => WebhookEvent::Other(other.to_string()),
        }
    }
}

/// Top-level webhook envelope.
#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    #[serde(default)]
    pub payload: Option<WebhookPayload>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub payment: Option<PaymentWrapper>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentWrapper {
    pub entity: PaymentEntity,
}

/// Payment details reported by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEntity {
    pub id: String,
    pub order_id: Option<String>,
    pub method: Option<String>,
    pub error_code: Option<String>,
    pub error_description: Option<String>,
}

impl WebhookEnvelope {
    pub fn kind(&self) -> WebhookEvent {
        WebhookEvent::from(self.event.as_str())
    }

    pub fn payment(&self) -> Option<&PaymentEntity> {
        self.payload
            .as_ref()
            .and_then(|p| p.payment.as_ref())
            .map(|p| &p.entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_failed_payment_event() {
        let body = r#"{
            "entity": "event",
            "event": "payment.failed",
            "payload": {"payment": {"entity": {
                "id": "pay_1", "order_id": "order_1", "method": "card",
                "error_code": "BAD_REQUEST_ERROR", "amount": 50000
            }}}
        }"#;
        let envelope: WebhookEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.kind(), WebhookEvent::PaymentFailed);

        let payment = envelope.payment().unwrap();
        assert_eq!(payment.id, "pay_1");
        assert_eq!(payment.order_id.as_deref(), Some("order_1"));
        assert_eq!(payment.error_code.as_deref(), Some("BAD_REQUEST_ERROR"));
    }

    #[test]
    fn unknown_events_are_kept_verbatim() {
        let envelope: WebhookEnvelope =
            serde_json::from_str(r#"{"event": "order.paid"}"#).unwrap();
        assert_eq!(envelope.kind(), WebhookEvent::Other("order.paid".to_string()));
        assert!(envelope.payment().is_none());
    }
}
