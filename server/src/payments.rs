//! Payment-adjacent helpers.
//!
//! The real gateway is an external collaborator: the intent endpoint
//! fabricates a gateway-shaped order intent locally instead of calling
//! out, and verification only checks the HMAC signature the gateway
//! would have produced. The delivery fee is a mock, not a distance
//! calculation.

use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::Serialize;
use sha2::Sha256;
use uuid::Uuid;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Gateway-shaped order intent. Amount is in the smallest currency unit.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub id: String,
    pub amount: u64,
    pub currency: String,
    pub receipt: String,
    pub key_id: String,
}

pub fn create_intent(amount: u64, key_id: &str) -> PaymentIntent {
    PaymentIntent {
        id: format!("order_{}", Uuid::new_v4().simple()),
        amount: amount * 100,
        currency: "INR".to_string(),
        receipt: format!("receipt_{}", Utc::now().timestamp_millis()),
        key_id: key_id.to_string(),
    }
}

/// Checks the gateway signature: HMAC-SHA256 over
/// `"{gateway_order_id}|{payment_id}"`, hex-encoded. The literal
/// `mock_signature` passes only when mock payments are enabled in config.
pub fn verify_signature(
    gateway_order_id: &str,
    payment_id: &str,
    signature: &str,
    secret: &str,
    allow_mock: bool,
) -> Result<bool, AppError> {
    if allow_mock && signature == "mock_signature" {
        return Ok(true);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(Box::new(e)))?;
    mac.update(format!("{gateway_order_id}|{payment_id}").as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    Ok(expected == signature)
}

#[derive(Debug, Serialize)]
pub struct DeliveryFee {
    pub fee: u32,
    pub distance: String,
}

/// Base fee plus a random distance charge. Not a real calculation.
pub fn delivery_fee() -> DeliveryFee {
    DeliveryFee {
        fee: 40 + rand::thread_rng().gen_range(0..50),
        distance: "3.5 km".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(order_id: &str, payment_id: &str, secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signatures_pass() {
        let sig = sign("order_1", "pay_1", "secret");
        assert!(verify_signature("order_1", "pay_1", &sig, "secret", false).unwrap());
    }

    #[test]
    fn tampered_signatures_fail() {
        let sig = sign("order_1", "pay_1", "secret");
        assert!(!verify_signature("order_1", "pay_2", &sig, "secret", false).unwrap());
        assert!(!verify_signature("order_1", "pay_1", &sig, "other", false).unwrap());
    }

    #[test]
    fn mock_signature_is_gated_by_config() {
        assert!(verify_signature("o", "p", "mock_signature", "secret", true).unwrap());
        assert!(!verify_signature("o", "p", "mock_signature", "secret", false).unwrap());
    }

    #[test]
    fn intent_amount_is_in_smallest_unit() {
        let intent = create_intent(560, "key-id");
        assert_eq!(intent.amount, 56_000);
        assert_eq!(intent.currency, "INR");
        assert!(intent.id.starts_with("order_"));
    }

    #[test]
    fn fee_stays_in_the_mock_range() {
        for _ in 0..100 {
            let fee = delivery_fee();
            assert!((40..90).contains(&fee.fee));
        }
    }
}
