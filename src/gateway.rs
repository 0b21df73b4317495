//! Payment gateway client and signature checks.
//!
//! The gateway is only trusted through signatures:
//!
//! - A checkout confirmation carries `HMAC-SHA256(key_secret, "{order_id}|{payment_id}")`
//! - A webhook body carries `HMAC-SHA256(webhook_secret, raw_body)` in the
//!   `X-Razorpay-Signature` header
//!
//! Both are hex-encoded. Comparison goes through [`Mac::verify_slice`], which
//! is constant-time.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use url::Url;

use crate::{error::AppError, money::Money};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook body signature.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// An order as created on the gateway side.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
}

/// Creates checkout orders on an external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an order for `amount`; `receipt` is our own reference.
    async fn create_order(
        &self,
        amount: Money,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, AppError>;
}

/// Razorpay Orders API client.
pub struct RazorpayGateway {
    client: reqwest::Client,
    orders_url: Url,
    key_id: String,
    key_secret: String,
}

#[derive(Serialize)]
struct OrderBody<'a> {
    /// In the currency's minor unit (paise).
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

impl RazorpayGateway {
    /// # Errors
    ///
    /// Returns `InvalidRequest` if `base_url` is not a valid URL or the HTTP
    /// client cannot be built.
    pub fn new(base_url: &str, key_id: String, key_secret: String) -> Result<Self, AppError> {
        let base = Url::parse(base_url)
            .map_err(|e| AppError::InvalidRequest(format!("Invalid gateway URL: {e}")))?;
        let orders_url = base
            .join("orders")
            .map_err(|e| AppError::InvalidRequest(format!("Invalid gateway URL: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::InvalidRequest(format!("HTTP client error: {e}")))?;

        Ok(Self {
            client,
            orders_url,
            key_id,
            key_secret,
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(
        &self,
        amount: Money,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, AppError> {
        let body = OrderBody {
            amount: amount.to_minor()?,
            currency,
            receipt,
        };

        let response = self
            .client
            .post(self.orders_url.clone())
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Order request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "Order request returned {status}: {detail}"
            )));
        }

        response
            .json::<GatewayOrder>()
            .await
            .map_err(|e| AppError::Gateway(format!("Malformed order response: {e}")))
    }
}

fn mac(secret: &str) -> Result<HmacSha256, AppError> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::InvalidRequest("Unusable signing secret".to_string()))
}

/// Hex signature the gateway attaches to a checkout confirmation.
pub fn sign_payment(secret: &str, order_id: &str, payment_id: &str) -> Result<String, AppError> {
    let mut mac = mac(secret)?;
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Hex signature of a raw webhook body.
pub fn sign_webhook(secret: &str, body: &[u8]) -> Result<String, AppError> {
    let mut mac = mac(secret)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a checkout confirmation signature.
///
/// # Errors
///
/// `SignatureInvalid` if the signature is not hex or does not match.
pub fn verify_payment_signature(
    secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<(), AppError> {
    let mut mac = mac(secret)?;
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    check(mac, signature)
}

/// Check a webhook body signature.
pub fn verify_webhook_signature(
    secret: &str,
    body: &[u8],
    signature: &str,
) -> Result<(), AppError> {
    let mut mac = mac(secret)?;
    mac.update(body);
    check(mac, signature)
}

fn check(mac: HmacSha256, signature: &str) -> Result<(), AppError> {
    let expected = hex::decode(signature.trim()).map_err(|_| AppError::SignatureInvalid)?;
    mac.verify_slice(&expected)
        .map_err(|_| AppError::SignatureInvalid)
}
