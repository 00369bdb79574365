use crate::{
    db::{handlers::Payments, models::payments::PaymentCompletion},
    errors::{Error, Result},
    payments::webhook::{verify_signature, WebhookEvent},
    AppState,
};
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub status: String,
    pub event_type: String,
}

#[utoipa::path(
    post,
    path = "/webhook/stripe",
    tag = "webhooks",
    summary = "Stripe events",
    description = "Completes the referenced checkout session on `checkout.session.completed` and \
                   `payment_intent.succeeded`. Other events are acknowledged and ignored.",
    request_body(content = String, content_type = "application/json"),
    params(("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hex hmac>")),
    responses(
        (status = 200, description = "Event handled", body = WebhookAck),
        (status = 400, description = "Missing or invalid signature, or unparsable payload"),
        (status = 500, description = "Webhook secret not configured"),
    )
)]
pub async fn stripe_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| Error::BadRequest {
            message: "Missing Stripe signature".to_string(),
        })?;

    let secret = state.config.payments.webhook_secret.as_deref().ok_or_else(|| Error::Upstream {
        message: "Payment system not configured".to_string(),
    })?;

    let event = verify_signature(&body, signature, secret, Utc::now().timestamp())
        .and_then(|()| WebhookEvent::parse(&body))
        .map_err(|e| {
            warn!(error = %e, "rejected webhook");
            Error::BadRequest {
                message: format!("Webhook error: {e}"),
            }
        })?;

    match event.completed_session_id() {
        Some(session_id) => {
            let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
            match Payments::new(&mut conn).complete(session_id).await? {
                PaymentCompletion::Completed { new_balance, .. } => {
                    info!(session_id, new_balance, event_type = %event.event_type, "payment confirmed by webhook");
                }
                PaymentCompletion::AlreadyCompleted { .. } => {
                    info!(session_id, "webhook for an already completed session");
                }
                PaymentCompletion::Unknown => {
                    warn!(session_id, "webhook for an unknown session");
                }
            }
        }
        None => info!(event_type = %event.event_type, "webhook event acknowledged"),
    }

    Ok(Json(WebhookAck {
        status: "success".to_string(),
        event_type: event.event_type,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::models::{credits::CreditPackage, users::UserType},
        db::{
            handlers::Credits,
            models::{
                credits::CreditTransactionType,
                payments::{PaymentCreateDBRequest, PaymentStatus},
            },
        },
        payments::webhook::sign,
        test_utils::*,
        types::UserId,
    };
    use axum::http::StatusCode;
    use rust_decimal::Decimal;
    use serde_json::json;
    use sqlx::PgPool;

    async fn record_payment(pool: &PgPool, user_id: UserId, session_id: &str) {
        let mut conn = pool.acquire().await.expect("Failed to acquire connection");
        Payments::new(&mut conn)
            .create(&PaymentCreateDBRequest {
                session_id: session_id.to_string(),
                user_id,
                amount: Decimal::new(15000, 2),
                currency: "usd".to_string(),
                credits_purchased: 3,
                package_type: CreditPackage::Starter,
                metadata: json!({}),
            })
            .await
            .expect("Failed to record payment");
    }

    fn signed(body: &str) -> String {
        sign(body.as_bytes(), TEST_WEBHOOK_SECRET, Utc::now().timestamp())
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_replayed_webhook_credits_once(pool: PgPool) {
        let (app, _) = create_test_app(pool.clone()).await;
        let pro = create_test_user(&pool, UserType::Professional).await;
        record_payment(&pool, pro.id, "cs_webhook_1").await;

        let body = json!({
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_webhook_1"}}
        })
        .to_string();

        for _ in 0..2 {
            let response = app
                .post("/api/webhook/stripe")
                .add_header(SIGNATURE_HEADER.to_string(), signed(&body))
                .text(body.clone())
                .await;
            response.assert_status_ok();
            let ack: WebhookAck = response.json();
            assert_eq!(ack.status, "success");
            assert_eq!(ack.event_type, "checkout.session.completed");
        }

        let mut conn = pool.acquire().await.expect("Failed to acquire connection");
        let payment = Payments::new(&mut conn)
            .get_by_session_id("cs_webhook_1")
            .await
            .expect("Failed to load payment")
            .expect("payment exists");
        assert_eq!(payment.payment_status, PaymentStatus::Completed);

        let ledger = Credits::new(&mut conn)
            .list_user_transactions(pro.id, 0, 10)
            .await
            .expect("Failed to list ledger");
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].transaction_type, CreditTransactionType::Purchase);
        assert_eq!(ledger[0].balance_after, 3);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_payment_intent_uses_metadata_session(pool: PgPool) {
        let (app, _) = create_test_app(pool.clone()).await;
        let pro = create_test_user(&pool, UserType::Professional).await;
        record_payment(&pool, pro.id, "cs_webhook_2").await;

        let without_session = json!({
            "type": "payment_intent.succeeded",
            "data": {"object": {"id": "pi_1", "metadata": {}}}
        })
        .to_string();
        app.post("/api/webhook/stripe")
            .add_header(SIGNATURE_HEADER.to_string(), signed(&without_session))
            .text(without_session)
            .await
            .assert_status_ok();

        let mut conn = pool.acquire().await.expect("Failed to acquire connection");
        assert_eq!(Credits::new(&mut conn).get_user_balance(pro.id).await.expect("balance"), 0);

        let with_session = json!({
            "type": "payment_intent.succeeded",
            "data": {"object": {"id": "pi_2", "metadata": {"session_id": "cs_webhook_2"}}}
        })
        .to_string();
        app.post("/api/webhook/stripe")
            .add_header(SIGNATURE_HEADER.to_string(), signed(&with_session))
            .text(with_session)
            .await
            .assert_status_ok();

        assert_eq!(Credits::new(&mut conn).get_user_balance(pro.id).await.expect("balance"), 3);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_rejects_bad_signatures(pool: PgPool) {
        let (app, _) = create_test_app(pool).await;
        let body = json!({"type": "customer.created", "data": {"object": {}}}).to_string();

        let missing = app.post("/api/webhook/stripe").text(body.clone()).await;
        missing.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(missing.json::<serde_json::Value>()["detail"], "Missing Stripe signature");

        let forged = sign(body.as_bytes(), "whsec_wrong", Utc::now().timestamp());
        let response = app
            .post("/api/webhook/stripe")
            .add_header(SIGNATURE_HEADER.to_string(), forged)
            .text(body.clone())
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.json::<serde_json::Value>()["detail"]
            .as_str()
            .is_some_and(|detail| detail.starts_with("Webhook error: ")));

        let stale = sign(body.as_bytes(), TEST_WEBHOOK_SECRET, Utc::now().timestamp() - 3600);
        app.post("/api/webhook/stripe")
            .add_header(SIGNATURE_HEADER.to_string(), stale)
            .text(body.clone())
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let garbage = "not json";
        app.post("/api/webhook/stripe")
            .add_header(SIGNATURE_HEADER.to_string(), signed(garbage))
            .text(garbage)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let response = app
            .post("/api/webhook/stripe")
            .add_header(SIGNATURE_HEADER.to_string(), signed(&body))
            .text(body)
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<WebhookAck>().event_type, "customer.created");
    }
}
