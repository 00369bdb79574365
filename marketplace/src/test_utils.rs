use crate::{
    api::models::{
        profiles::ServiceCategory,
        requests::{RequestCreate, Submitter, Urgency},
        users::UserType,
    },
    auth::session::create_session_token,
    chat::ChatModel,
    config::{AuthConfig, Config, PaymentProviderKind, PaymentsConfig},
    db::{
        handlers::{Credits, Profiles, Repository, Requests, Users},
        models::{
            credits::CreditTransactionCreateDBRequest,
            profiles::{ProfileCreateDBRequest, ProfileDBResponse},
            requests::{RequestCreateDBRequest, RequestDBResponse},
            users::{UserCreateDBRequest, UserDBResponse},
        },
    },
    email::Notifier,
    payments::dummy::DummyProvider,
    types::UserId,
    AppState,
};
use axum_test::TestServer;
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "correct-horse-battery";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: std::env::var("TEST_DATABASE_URL").unwrap_or_else(|_| "postgres://postgres@localhost/test".to_string()),
        admin_email: "admin@test.com".to_string(),
        admin_password: None,
        auth: AuthConfig {
            jwt_secret: "test-secret-key-for-testing-only".to_string(),
            token_lifetime: Duration::from_secs(30 * 60),
        },
        payments: PaymentsConfig {
            provider: PaymentProviderKind::Dummy,
            api_key: None,
            webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// State with a dummy checkout the test can drive, and no chat model
pub fn create_test_state(pool: PgPool) -> (AppState, Arc<DummyProvider>) {
    let payments = Arc::new(DummyProvider::default());
    let state = AppState::builder()
        .db(pool)
        .config(create_test_config())
        .payments(payments.clone())
        .notifier(Notifier::disabled())
        .build();
    (state, payments)
}

pub fn create_test_server(state: AppState) -> TestServer {
    let router = crate::build_router(state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

pub async fn create_test_app(pool: PgPool) -> (TestServer, Arc<DummyProvider>) {
    let (state, payments) = create_test_state(pool);
    (create_test_server(state), payments)
}

pub async fn create_test_app_with_chat(pool: PgPool, model: Arc<dyn ChatModel>) -> TestServer {
    let (state, _) = create_test_state(pool);
    create_test_server(AppState { chat: Some(model), ..state })
}

pub async fn create_test_user(pool: &PgPool, user_type: UserType) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let id = Uuid::new_v4();
    let password_hash = crate::auth::password::hash_string(TEST_PASSWORD).expect("Failed to hash password");

    Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            email: format!("testuser_{}@example.com", id.simple()),
            password_hash,
            user_type,
            first_name: "Test".to_string(),
            last_name: format!("{user_type:?}"),
            phone: Some("555-0100".to_string()),
        })
        .await
        .expect("Failed to create test user")
}

pub async fn create_test_profile(pool: &PgPool, user_id: UserId, categories: Vec<ServiceCategory>) -> ProfileDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Profiles::new(&mut conn)
        .create(
            &ProfileCreateDBRequest::builder()
                .user_id(user_id)
                .business_name(format!("Test Business {}", user_id.simple()))
                .service_categories(categories)
                .description("Reliable work since 2010".to_string())
                .service_areas(vec!["Toronto".to_string()])
                .years_experience(12)
                .city("Toronto".to_string())
                .province("Ontario".to_string())
                .postal_code("M5V 2T6".to_string())
                .build(),
        )
        .await
        .expect("Failed to create test profile")
}

pub async fn create_test_request(pool: &PgPool, customer_id: UserId, service_category: ServiceCategory) -> RequestDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Requests::new(&mut conn)
        .create(&RequestCreateDBRequest::new(
            Submitter::Customer { customer_id },
            test_request_body(service_category),
        ))
        .await
        .expect("Failed to create test request")
}

pub fn test_request_body(service_category: ServiceCategory) -> RequestCreate {
    RequestCreate {
        service_category,
        title: "Bathroom renovation".to_string(),
        description: "Replace tub and tiles".to_string(),
        location: "Toronto, Ontario".to_string(),
        city: "Toronto".to_string(),
        province: "Ontario".to_string(),
        budget_min: Some(rust_decimal::Decimal::new(5000, 0)),
        budget_max: Some(rust_decimal::Decimal::new(8000, 0)),
        timeline: "Within a month".to_string(),
        urgency: Urgency::Medium,
        contact_preference: "email".to_string(),
        property_type: Some("condo".to_string()),
        square_footage: Some(80),
        additional_details: serde_json::json!({}),
    }
}

/// Credit an account as if a purchase had completed
pub async fn grant_credits(pool: &PgPool, user_id: UserId, amount: i64) -> i64 {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let session_id = format!("cs_grant_{}", Uuid::new_v4().simple());
    Credits::new(&mut conn)
        .create_transaction(&CreditTransactionCreateDBRequest::purchase(
            user_id,
            amount,
            &session_id,
            "Test credit grant".to_string(),
        ))
        .await
        .expect("Failed to grant credits")
        .balance_after
}

pub fn add_auth_headers(user: &UserDBResponse) -> (String, String) {
    let token = create_session_token(user, &create_test_config().auth).expect("Failed to sign test token");
    ("authorization".to_string(), format!("Bearer {token}"))
}
