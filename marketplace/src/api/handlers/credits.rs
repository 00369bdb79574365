use crate::{
    api::models::credits::{
        BalanceResponse, CreditPackage, CreditTransactionResponse, PackageResponse, PackagesResponse, PaymentStatusResponse,
        PurchaseRequest, PurchaseResponse, TransactionsResponse,
    },
    auth::permissions::{operation, resource, RequiresPermission},
    db::{
        handlers::{Credits, Payments},
        models::payments::{PaymentCompletion, PaymentCreateDBRequest, PaymentStatus},
    },
    errors::{Error, Result},
    payments::{CheckoutRequest, CheckoutStatus},
    AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{error, info};

const CURRENCY: &str = "usd";
const TRANSACTIONS_LIMIT: i64 = 50;

#[utoipa::path(
    get,
    path = "/credits/packages",
    tag = "credits",
    summary = "Credit packages",
    responses(
        (status = 200, description = "Every package on sale", body = PackagesResponse),
    )
)]
pub async fn list_packages() -> Json<PackagesResponse> {
    Json(PackagesResponse {
        packages: CreditPackage::ALL.into_iter().map(PackageResponse::from).collect(),
    })
}

#[utoipa::path(
    get,
    path = "/credits/balance",
    tag = "credits",
    summary = "Credit balance",
    responses(
        (status = 200, description = "Balance derived from the ledger", body = BalanceResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Professionals only"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_balance(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Credits, operation::ReadOwn>,
) -> Result<Json<BalanceResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let summary = Credits::new(&mut conn).get_balance_summary(current_user.id).await?;

    Ok(Json(BalanceResponse::new(current_user.id, summary)))
}

#[utoipa::path(
    post,
    path = "/credits/purchase",
    tag = "credits",
    summary = "Start a credit purchase",
    description = "Opens a hosted checkout session. Credits are added once the session is confirmed \
                   through `/credits/payment-status/{session_id}` or the payment webhook.",
    request_body = PurchaseRequest,
    responses(
        (status = 200, description = "Checkout session created", body = PurchaseResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Professionals only"),
        (status = 422, description = "Unknown package"),
        (status = 500, description = "Payment provider failure"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn purchase_credits(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Credits, operation::CreateOwn>,
    Json(request): Json<PurchaseRequest>,
) -> Result<Json<PurchaseResponse>> {
    let package = request.package_type;
    let details = package.details();
    let origin = request.origin_url.trim_end_matches('/');

    let metadata = BTreeMap::from([
        ("user_id".to_string(), current_user.id.to_string()),
        ("package_type".to_string(), package.as_str().to_string()),
        ("credits".to_string(), details.credits.to_string()),
        ("purpose".to_string(), "credit_purchase".to_string()),
    ]);

    let session = state
        .payments
        .create_checkout_session(&CheckoutRequest {
            amount: details.price,
            currency: CURRENCY.to_string(),
            product_name: details.name.to_string(),
            success_url: format!("{origin}/credits/success?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{origin}/credits"),
            metadata,
        })
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %current_user.id, "checkout session creation failed");
            Error::Upstream {
                message: "Failed to create payment session".to_string(),
            }
        })?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Payments::new(&mut conn)
        .create(&PaymentCreateDBRequest {
            session_id: session.session_id.clone(),
            user_id: current_user.id,
            amount: details.price,
            currency: CURRENCY.to_string(),
            credits_purchased: details.credits,
            package_type: package,
            metadata: json!({
                "package_name": details.name,
                "user_email": current_user.email,
            }),
        })
        .await?;

    info!(session_id = %session.session_id, user_id = %current_user.id, package = package.as_str(), "checkout started");
    Ok(Json(PurchaseResponse {
        checkout_url: session.url,
        session_id: session.session_id,
    }))
}

#[utoipa::path(
    get,
    path = "/credits/payment-status/{session_id}",
    tag = "credits",
    summary = "Confirm a checkout session",
    description = "Asks the payment provider about the session and completes it when paid. \
                   Credits are added exactly once however often this is polled.",
    params(("session_id" = String, Path, description = "Checkout session ID")),
    responses(
        (status = 200, description = "Current status", body = PaymentStatusResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Professionals only"),
        (status = 404, description = "Payment transaction not found"),
        (status = 500, description = "Payment provider failure"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn payment_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    current_user: RequiresPermission<resource::Credits, operation::ReadOwn>,
) -> Result<Json<PaymentStatusResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let payment = Payments::new(&mut conn)
        .get_for_user(&session_id, current_user.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Payment transaction".to_string(),
            id: session_id.clone(),
        })?;

    if payment.payment_status == PaymentStatus::Completed {
        let new_balance = Credits::new(&mut conn).get_user_balance(current_user.id).await?;
        return Ok(Json(PaymentStatusResponse {
            payment_status: PaymentStatus::Completed,
            credits_added: payment.credits_purchased,
            new_balance,
        }));
    }

    let checkout = state.payments.checkout_status(&session_id).await.map_err(|e| {
        error!(error = %e, session_id, "checkout status lookup failed");
        Error::Upstream {
            message: "Failed to check payment status".to_string(),
        }
    })?;

    let response = match checkout {
        CheckoutStatus::Paid => match Payments::new(&mut conn).complete(&session_id).await? {
            PaymentCompletion::Completed { payment, new_balance } => PaymentStatusResponse {
                payment_status: PaymentStatus::Completed,
                credits_added: payment.credits_purchased,
                new_balance,
            },
            // The webhook got there first
            PaymentCompletion::AlreadyCompleted { payment } => PaymentStatusResponse {
                payment_status: PaymentStatus::Completed,
                credits_added: payment.credits_purchased,
                new_balance: Credits::new(&mut conn).get_user_balance(current_user.id).await?,
            },
            PaymentCompletion::Unknown => {
                return Err(Error::NotFound {
                    resource: "Payment transaction".to_string(),
                    id: session_id,
                })
            }
        },
        CheckoutStatus::Expired | CheckoutStatus::Open => {
            let status = if checkout == CheckoutStatus::Expired {
                PaymentStatus::Expired
            } else {
                PaymentStatus::Pending
            };
            // `None` means a concurrent confirmation completed the session
            let payment_status = match Payments::new(&mut conn).set_status(&session_id, status).await? {
                Some(payment) => payment.payment_status,
                None => PaymentStatus::Completed,
            };
            let credits_added = if payment_status == PaymentStatus::Completed {
                payment.credits_purchased
            } else {
                0
            };
            PaymentStatusResponse {
                payment_status,
                credits_added,
                new_balance: Credits::new(&mut conn).get_user_balance(current_user.id).await?,
            }
        }
    };

    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/credits/transactions",
    tag = "credits",
    summary = "Credit ledger",
    responses(
        (status = 200, description = "Ledger entries, newest first", body = TransactionsResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Professionals only"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Credits, operation::ReadOwn>,
) -> Result<Json<TransactionsResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let transactions = Credits::new(&mut conn)
        .list_user_transactions(current_user.id, 0, TRANSACTIONS_LIMIT)
        .await?;

    Ok(Json(TransactionsResponse {
        transactions: transactions.into_iter().map(CreditTransactionResponse::from).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::models::users::UserType,
        db::models::credits::CreditTransactionType,
        payments::webhook::sign,
        test_utils::*,
    };
    use axum::http::StatusCode;
    use sqlx::PgPool;

    async fn start_purchase(app: &axum_test::TestServer, auth: &(String, String), package: &str) -> PurchaseResponse {
        let response = app
            .post("/api/credits/purchase")
            .add_header(auth.0.clone(), auth.1.clone())
            .json(&json!({"package_type": package, "origin_url": "https://app.example.com/"}))
            .await;
        response.assert_status_ok();
        response.json()
    }

    async fn poll(app: &axum_test::TestServer, auth: &(String, String), session_id: &str) -> PaymentStatusResponse {
        let response = app
            .get(&format!("/api/credits/payment-status/{session_id}"))
            .add_header(auth.0.clone(), auth.1.clone())
            .await;
        response.assert_status_ok();
        response.json()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_packages_are_public(pool: PgPool) {
        let (app, _) = create_test_app(pool).await;

        let response = app.get("/api/credits/packages").await;
        response.assert_status_ok();
        let body: PackagesResponse = response.json();
        assert_eq!(body.packages.len(), 6);
        assert_eq!(body.packages[0].package_type, CreditPackage::Starter);
        assert_eq!(body.packages[0].credits, 3);
        assert_eq!(body.packages[0].name, "Tester Pack");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_credit_routes_are_for_professionals(pool: PgPool) {
        let (app, _) = create_test_app(pool.clone()).await;
        let customer = create_test_user(&pool, UserType::Customer).await;
        let admin = create_test_user(&pool, UserType::Admin).await;

        for user in [&customer, &admin] {
            let (name, value) = add_auth_headers(user);
            app.get("/api/credits/balance")
                .add_header(name.clone(), value.clone())
                .await
                .assert_status_forbidden();
            app.post("/api/credits/purchase")
                .add_header(name, value)
                .json(&json!({"package_type": "starter_10", "origin_url": "https://app.example.com"}))
                .await
                .assert_status_forbidden();
        }
        app.get("/api/credits/balance").await.assert_status_unauthorized();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_purchase_and_poll_credits_once(pool: PgPool) {
        let (app, payments) = create_test_app(pool.clone()).await;
        let pro = create_test_user(&pool, UserType::Professional).await;
        let auth = add_auth_headers(&pro);

        let purchase = start_purchase(&app, &auth, "basic_25").await;
        assert!(purchase.checkout_url.starts_with("https://app.example.com/credits/success?session_id=cs_dummy_"));

        let pending = poll(&app, &auth, &purchase.session_id).await;
        assert_eq!(pending.payment_status, PaymentStatus::Pending);
        assert_eq!(pending.credits_added, 0);
        assert_eq!(pending.new_balance, 0);

        payments.mark_paid(&purchase.session_id);
        for _ in 0..3 {
            let done = poll(&app, &auth, &purchase.session_id).await;
            assert_eq!(done.payment_status, PaymentStatus::Completed);
            assert_eq!(done.credits_added, 25);
            assert_eq!(done.new_balance, 25);
        }

        let balance: BalanceResponse = app
            .get("/api/credits/balance")
            .add_header(auth.0.clone(), auth.1.clone())
            .await
            .json();
        assert_eq!(balance.balance, 25);
        assert_eq!(balance.total_purchased, 25);
        assert_eq!(balance.total_used, 0);

        let ledger: TransactionsResponse = app
            .get("/api/credits/transactions")
            .add_header(auth.0, auth.1)
            .await
            .json();
        assert_eq!(ledger.transactions.len(), 1);
        assert_eq!(ledger.transactions[0].transaction_type, CreditTransactionType::Purchase);
        assert_eq!(ledger.transactions[0].payment_session_id.as_deref(), Some(purchase.session_id.as_str()));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_webhook_then_poll_credits_once(pool: PgPool) {
        let (app, payments) = create_test_app(pool.clone()).await;
        let pro = create_test_user(&pool, UserType::Professional).await;
        let auth = add_auth_headers(&pro);

        let purchase = start_purchase(&app, &auth, "starter_10").await;
        payments.mark_paid(&purchase.session_id);

        let body = json!({
            "type": "checkout.session.completed",
            "data": {"object": {"id": purchase.session_id}}
        })
        .to_string();
        let signature = sign(body.as_bytes(), TEST_WEBHOOK_SECRET, chrono::Utc::now().timestamp());
        app.post("/api/webhook/stripe")
            .add_header("stripe-signature".to_string(), signature)
            .text(body)
            .await
            .assert_status_ok();

        let status = poll(&app, &auth, &purchase.session_id).await;
        assert_eq!(status.payment_status, PaymentStatus::Completed);
        assert_eq!(status.credits_added, 3);
        assert_eq!(status.new_balance, 3);

        let balance: BalanceResponse = app
            .get("/api/credits/balance")
            .add_header(auth.0, auth.1)
            .await
            .json();
        assert_eq!(balance.balance, 3);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_expired_and_foreign_sessions(pool: PgPool) {
        let (app, payments) = create_test_app(pool.clone()).await;
        let pro = create_test_user(&pool, UserType::Professional).await;
        let other = create_test_user(&pool, UserType::Professional).await;
        let auth = add_auth_headers(&pro);

        let purchase = start_purchase(&app, &auth, "premium_100").await;
        payments.mark_expired(&purchase.session_id);

        let expired = poll(&app, &auth, &purchase.session_id).await;
        assert_eq!(expired.payment_status, PaymentStatus::Expired);
        assert_eq!(expired.credits_added, 0);

        let (name, value) = add_auth_headers(&other);
        app.get(&format!("/api/credits/payment-status/{}", purchase.session_id))
            .add_header(name, value)
            .await
            .assert_status_not_found();

        app.get("/api/credits/payment-status/cs_missing")
            .add_header(auth.0, auth.1)
            .await
            .assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_package_is_rejected(pool: PgPool) {
        let (app, _) = create_test_app(pool.clone()).await;
        let pro = create_test_user(&pool, UserType::Professional).await;
        let (name, value) = add_auth_headers(&pro);

        app.post("/api/credits/purchase")
            .add_header(name, value)
            .json(&json!({"package_type": "mega_9000", "origin_url": "https://app.example.com"}))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }
}
