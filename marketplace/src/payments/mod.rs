//! Hosted checkout for credit purchases.

pub mod dummy;
pub mod stripe;
pub mod webhook;

use crate::config::{PaymentProviderKind, PaymentsConfig};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("payment provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected payment provider response: {0}")]
    InvalidResponse(String),

    #[error("unknown checkout session: {0}")]
    UnknownSession(String),
}

/// What to charge and where to send the buyer afterwards
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub amount: Decimal,
    pub currency: String,
    pub product_name: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStatus {
    Paid,
    Expired,
    /// Neither paid nor expired yet
    Open,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, PaymentError>;

    async fn checkout_status(&self, session_id: &str) -> Result<CheckoutStatus, PaymentError>;
}

/// Amount in the currency's minor unit, as checkout APIs expect
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    use rust_decimal::prelude::ToPrimitive;
    (amount * Decimal::ONE_HUNDRED).round().to_i64()
}

pub fn provider_from_config(config: &PaymentsConfig) -> anyhow::Result<Arc<dyn PaymentProvider>> {
    match config.provider {
        PaymentProviderKind::Stripe => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("payments.api_key is required for stripe"))?;
            Ok(Arc::new(stripe::Stripe::new(config.api_base.clone(), api_key)))
        }
        PaymentProviderKind::Dummy => Ok(Arc::new(dummy::DummyProvider::default())),
    }
}
