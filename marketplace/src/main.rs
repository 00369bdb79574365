mod api;
mod auth;
mod chat;
mod config;
mod db;
mod email;
mod errors;
mod openapi;
mod payments;
mod types;

#[cfg(test)]
mod test_utils;

use crate::{
    api::models::users::UserType,
    auth::password,
    chat::{model_from_config, ChatModel},
    db::{
        handlers::{Repository, Users},
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    email::Notifier,
    openapi::ApiDoc,
    payments::{provider_from_config, PaymentProvider},
};
use axum::{
    http::{HeaderValue, Request, Response},
    routing::{delete, get, post, put},
    Router,
};
use bon::Builder;
use clap::Parser;
use config::{Args, Config};
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info, instrument, warn, Span};
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

pub use types::UserId;

#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub payments: Arc<dyn PaymentProvider>,
    /// Absent when the assistant is disabled
    pub chat: Option<Arc<dyn ChatModel>>,
    pub notifier: Notifier,
}

/// Create the initial admin user, or reset its password if it already exists.
///
/// Without a configured password a missing admin can't be created, so this logs and returns
/// `None`.
#[instrument(skip(password, db))]
pub async fn create_initial_admin_user(email: &str, password: Option<&str>, db: &PgPool) -> anyhow::Result<Option<UserId>> {
    let password_hash = password
        .map(password::hash_string)
        .transpose()
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {e}"))?;

    let mut tx = db.begin().await?;
    let mut user_repo = Users::new(&mut tx);

    if let Some(existing_user) = user_repo.get_user_by_email(email).await? {
        if let Some(password_hash) = password_hash {
            user_repo
                .update(
                    existing_user.id,
                    &UserUpdateDBRequest {
                        password_hash: Some(password_hash),
                        ..Default::default()
                    },
                )
                .await?;
            info!(user_id = %existing_user.id, "admin password updated");
        }
        tx.commit().await?;
        return Ok(Some(existing_user.id));
    }

    let Some(password_hash) = password_hash else {
        warn!("no admin password configured, skipping initial admin creation");
        return Ok(None);
    };

    let created_user = user_repo
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            password_hash,
            user_type: UserType::Admin,
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            phone: None,
        })
        .await?;

    tx.commit().await?;
    info!(user_id = %created_user.id, "initial admin user created");
    Ok(Some(created_user.id))
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    use crate::config::CorsOrigin;

    let cors_config = &config.cors;
    let wildcard = cors_config.allowed_origins.contains(&CorsOrigin::Wildcard);

    // `*` can't be listed, and can't be combined with credentials
    let allow_origin = if wildcard && cors_config.allow_credentials {
        AllowOrigin::mirror_request()
    } else if wildcard {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(cors_config.allow_credentials);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// The `/api` routes, with tracing, docs and CORS applied.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    use api::handlers::{admin, auth, chat, credits, customers, health, professionals, reviews, webhooks};

    let api_routes = Router::new()
        .route("/health", get(health::health))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::get_me).put(auth::update_me))
        // Professionals
        .route(
            "/professionals/profile",
            post(professionals::create_profile)
                .get(professionals::get_my_profile)
                .put(professionals::update_my_profile),
        )
        .route("/professionals/leads", get(professionals::list_my_leads))
        .route("/professionals/leads/preview", get(professionals::preview_leads))
        .route("/professionals/leads/{lead_id}/status", put(professionals::update_lead_status))
        .route("/professionals/leads/{request_id}/view", post(professionals::view_lead))
        .route("/professionals", get(professionals::search_professionals))
        .route("/professionals/", get(professionals::search_professionals))
        .route("/professionals/{professional_id}", get(professionals::get_professional))
        .route("/professionals/{professional_id}/reviews", get(reviews::list_professional_reviews))
        // Customers
        .route(
            "/customers/requests",
            post(customers::create_request).get(customers::list_my_requests),
        )
        .route("/customers/requests/quick", post(customers::create_quick_request))
        .route(
            "/customers/requests/{request_id}",
            get(customers::get_my_request)
                .put(customers::update_my_request)
                .delete(customers::delete_my_request),
        )
        // Admin
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{user_id}/status", put(admin::update_user_status))
        .route("/admin/profiles", get(admin::list_profiles))
        .route("/admin/profiles/{profile_id}/verify", put(admin::verify_profile))
        .route("/admin/customer-requests", get(admin::list_customer_requests))
        .route("/admin/leads", post(admin::assign_lead).get(admin::list_leads))
        .route("/admin/leads/{lead_id}", delete(admin::delete_lead))
        .route("/admin/stats", get(admin::platform_stats))
        // Credits
        .route("/credits/packages", get(credits::list_packages))
        .route("/credits/balance", get(credits::get_balance))
        .route("/credits/purchase", post(credits::purchase_credits))
        .route("/credits/payment-status/{session_id}", get(credits::payment_status))
        .route("/credits/transactions", get(credits::list_transactions))
        .route("/webhook/stripe", post(webhooks::stripe_webhook))
        // Chat
        .route("/chat/send", post(chat::send_message))
        .route("/chat/history/{session_id}", get(chat::get_history))
        .route("/chat/session/{session_id}", delete(chat::delete_session))
        .route("/chat/sessions", get(chat::list_sessions))
        // Reviews
        .route("/reviews", post(reviews::create_review))
        .route("/reviews/", post(reviews::create_review))
        .route("/reviews/my-reviews", get(reviews::list_my_reviews))
        .route("/reviews/{review_id}", delete(reviews::delete_review))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_response(|response: &Response<_>, latency: Duration, _span: &Span| {
                    tracing::info!(
                        status = %response.status(),
                        latency = ?latency,
                        "request completed"
                    );
                }),
        )
        .with_state(state.clone());

    let cors_layer = create_cors_layer(&state.config)?;

    let router = Router::new()
        .nest("/api", api_routes)
        .merge(RapiDoc::with_openapi("/api/openapi.json", ApiDoc::openapi()).path("/api/docs"))
        .layer(cors_layer);

    Ok(router)
}

/// Wire the configured integrations into an [`AppState`] and build the router.
#[instrument(skip_all)]
pub async fn setup_app(pool: PgPool, config: Config) -> anyhow::Result<Router> {
    let payments = provider_from_config(&config.payments)?;
    let chat = model_from_config(&config.chat);
    if chat.is_none() {
        info!("chat assistant disabled");
    }
    let notifier = Notifier::new(&config.email)?;

    let state = AppState::builder()
        .db(pool)
        .config(config)
        .payments(payments)
        .maybe_chat(chat)
        .notifier(notifier)
        .build();

    build_router(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    debug!("{:?}", args);

    let config = Config::load(&args)?;
    debug!(
        host = %config.host,
        port = config.port,
        payments = ?config.payments.provider,
        chat = config.chat.enabled,
        email = config.email.enabled,
        "configuration loaded"
    );

    let pool = PgPool::connect(&config.database_url).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    create_initial_admin_user(&config.admin_email, config.admin_password.as_deref(), &pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {e}"))?;

    let router = setup_app(pool, config.clone()).await?;

    let bind_addr = config.bind_address();
    let listener = TcpListener::bind(&bind_addr).await?;
    info!(
        "Marketplace listening on http://{}, docs at http://localhost:{}/api/docs",
        bind_addr, config.port
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

#[cfg(test)]
mod test {
    use super::{create_cors_layer, create_initial_admin_user};
    use crate::{
        api::{handlers::health::HealthResponse, models::users::UserType},
        auth::password,
        config::{Config, CorsConfig, CorsOrigin},
        db::handlers::Users,
        test_utils::*,
    };
    use axum::http::{header, HeaderValue, Method};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_initial_admin_created_with_password(pool: PgPool) {
        let id = create_initial_admin_user("root@example.com", Some("s3cret-admin"), &pool)
            .await
            .expect("Failed to create admin")
            .expect("admin should be created");

        let mut conn = pool.acquire().await.expect("Failed to acquire connection");
        let admin = Users::new(&mut conn)
            .get_user_by_email("root@example.com")
            .await
            .expect("Failed to load admin")
            .expect("admin exists");
        assert_eq!(admin.id, id);
        assert_eq!(admin.user_type, UserType::Admin);
        assert!(password::verify_string("s3cret-admin", &admin.password_hash));

        // Idempotent, and the password is reset on restart
        let again = create_initial_admin_user("root@example.com", Some("rotated"), &pool)
            .await
            .expect("Failed to rerun admin creation");
        assert_eq!(again, Some(id));
        let admin = Users::new(&mut conn)
            .get_user_by_email("root@example.com")
            .await
            .expect("Failed to load admin")
            .expect("admin exists");
        assert!(password::verify_string("rotated", &admin.password_hash));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_initial_admin_skipped_without_password(pool: PgPool) {
        let created = create_initial_admin_user("root@example.com", None, &pool)
            .await
            .expect("admin creation should not fail");
        assert_eq!(created, None);

        let existing = create_test_user(&pool, UserType::Admin).await;
        let found = create_initial_admin_user(&existing.email, None, &pool)
            .await
            .expect("admin lookup should not fail");
        assert_eq!(found, Some(existing.id));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_setup_app_serves_health_and_docs(pool: PgPool) {
        let router = crate::setup_app(pool, create_test_config())
            .await
            .expect("Failed to setup app");
        let server = axum_test::TestServer::new(router).expect("Failed to create test server");

        let health = server.get("/api/health").await;
        health.assert_status_ok();
        assert_eq!(health.json::<HealthResponse>().status, "healthy");

        let spec = server.get("/api/openapi.json").await;
        spec.assert_status_ok();
        let spec: serde_json::Value = spec.json();
        assert!(spec["paths"]["/credits/purchase"].is_object());
        assert!(spec["components"]["securitySchemes"]["bearer_auth"].is_object());

        server.get("/api/docs").await.assert_status_ok();
        server.get("/api/does-not-exist").await.assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_cors_allows_configured_origin(pool: PgPool) {
        let (state, _) = create_test_state(pool);
        let mut config = state.config.clone();
        config.cors = CorsConfig {
            allowed_origins: vec![CorsOrigin::Url("https://app.example.com".parse().expect("valid url"))],
            allow_credentials: true,
            max_age: Some(600),
        };
        let server = create_test_server(crate::AppState { config, ..state });

        let preflight = server
            .method(Method::OPTIONS, "/api/credits/balance")
            .add_header(header::ORIGIN, HeaderValue::from_static("https://app.example.com"))
            .add_header(header::ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("GET"))
            .add_header(header::ACCESS_CONTROL_REQUEST_HEADERS, HeaderValue::from_static("authorization"))
            .await;
        assert_eq!(
            preflight.header(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            HeaderValue::from_static("https://app.example.com")
        );
        assert_eq!(
            preflight.header(header::ACCESS_CONTROL_ALLOW_CREDENTIALS),
            HeaderValue::from_static("true")
        );

        let foreign = server
            .get("/api/health")
            .add_header(header::ORIGIN, HeaderValue::from_static("https://evil.example.com"))
            .await;
        assert!(foreign.maybe_header(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[test]
    fn test_default_cors_config_builds() {
        let config = Config::default();
        assert_eq!(config.cors.allowed_origins, vec![CorsOrigin::Wildcard]);
        create_cors_layer(&config).expect("default CORS config should build");

        let mut with_credentials = Config::default();
        with_credentials.cors.allow_credentials = true;
        with_credentials
            .cors
            .allowed_origins
            .push(CorsOrigin::Url("https://app.example.com".parse().expect("valid url")));
        create_cors_layer(&with_credentials).expect("wildcard with credentials should build");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_wildcard_cors_origin(pool: PgPool) {
        let (state, _) = create_test_state(pool);
        assert_eq!(state.config.cors.allowed_origins, vec![CorsOrigin::Wildcard]);
        let server = create_test_server(state.clone());

        let response = server
            .get("/api/health")
            .add_header(header::ORIGIN, HeaderValue::from_static("https://anywhere.example.com"))
            .await;
        response.assert_status_ok();
        assert_eq!(
            response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            HeaderValue::from_static("*")
        );

        // Credentials can't go with `*`, so the caller's origin is echoed back
        let mut config = state.config.clone();
        config.cors.allow_credentials = true;
        let server = create_test_server(crate::AppState { config, ..state });
        let response = server
            .get("/api/health")
            .add_header(header::ORIGIN, HeaderValue::from_static("https://anywhere.example.com"))
            .await;
        assert_eq!(
            response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            HeaderValue::from_static("https://anywhere.example.com")
        );
        assert_eq!(
            response.header(header::ACCESS_CONTROL_ALLOW_CREDENTIALS),
            HeaderValue::from_static("true")
        );
    }
}
