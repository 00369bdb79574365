use super::{CheckoutRequest, CheckoutSession, CheckoutStatus, PaymentError, PaymentProvider};
use async_trait::async_trait;
use std::{collections::HashMap, sync::Mutex};
use tracing::info;

/// In-process checkout. Sessions stay open until marked paid or expired,
/// which tests do directly and local setups do by hand.
#[derive(Default)]
pub struct DummyProvider {
    sessions: Mutex<HashMap<String, CheckoutStatus>>,
}

impl DummyProvider {
    fn set(&self, session_id: &str, status: CheckoutStatus) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(session_id.to_string(), status);
        }
    }

    pub fn mark_paid(&self, session_id: &str) {
        self.set(session_id, CheckoutStatus::Paid);
    }

    pub fn mark_expired(&self, session_id: &str) {
        self.set(session_id, CheckoutStatus::Expired);
    }
}

#[async_trait]
impl PaymentProvider for DummyProvider {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, PaymentError> {
        let session_id = format!("cs_dummy_{}", uuid::Uuid::new_v4().simple());
        self.set(&session_id, CheckoutStatus::Open);
        info!(session_id, amount = %request.amount, "dummy checkout session created");

        Ok(CheckoutSession {
            url: request.success_url.replace("{CHECKOUT_SESSION_ID}", &session_id),
            session_id,
        })
    }

    async fn checkout_status(&self, session_id: &str) -> Result<CheckoutStatus, PaymentError> {
        self.sessions
            .lock()
            .map_err(|_| PaymentError::InvalidResponse("session table poisoned".to_string()))?
            .get(session_id)
            .copied()
            .ok_or_else(|| PaymentError::UnknownSession(session_id.to_string()))
    }
}
