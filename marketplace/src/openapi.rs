use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{api, db};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            let scheme = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("JWT")
                .build();
            components
                .security_schemes
                .insert("bearer_auth".to_string(), SecurityScheme::Http(scheme));
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    servers(
        (url = "/api", description = "Marketplace API")
    ),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::health::health,
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::auth::get_me,
        api::handlers::auth::update_me,
        api::handlers::professionals::create_profile,
        api::handlers::professionals::get_my_profile,
        api::handlers::professionals::update_my_profile,
        api::handlers::professionals::list_my_leads,
        api::handlers::professionals::update_lead_status,
        api::handlers::professionals::preview_leads,
        api::handlers::professionals::view_lead,
        api::handlers::professionals::search_professionals,
        api::handlers::professionals::get_professional,
        api::handlers::customers::create_request,
        api::handlers::customers::list_my_requests,
        api::handlers::customers::get_my_request,
        api::handlers::customers::update_my_request,
        api::handlers::customers::delete_my_request,
        api::handlers::customers::create_quick_request,
        api::handlers::admin::list_users,
        api::handlers::admin::update_user_status,
        api::handlers::admin::list_profiles,
        api::handlers::admin::verify_profile,
        api::handlers::admin::list_customer_requests,
        api::handlers::admin::assign_lead,
        api::handlers::admin::list_leads,
        api::handlers::admin::delete_lead,
        api::handlers::admin::platform_stats,
        api::handlers::credits::list_packages,
        api::handlers::credits::get_balance,
        api::handlers::credits::purchase_credits,
        api::handlers::credits::payment_status,
        api::handlers::credits::list_transactions,
        api::handlers::webhooks::stripe_webhook,
        api::handlers::chat::send_message,
        api::handlers::chat::get_history,
        api::handlers::chat::delete_session,
        api::handlers::chat::list_sessions,
        api::handlers::reviews::create_review,
        api::handlers::reviews::list_my_reviews,
        api::handlers::reviews::delete_review,
        api::handlers::reviews::list_professional_reviews,
    ),
    components(
        schemas(
            api::handlers::health::HealthResponse,
            api::handlers::webhooks::WebhookAck,
            api::models::auth::RegisterRequest,
            api::models::auth::LoginForm,
            api::models::auth::TokenResponse,
            api::models::users::UserType,
            api::models::users::UserResponse,
            api::models::users::UserUpdate,
            api::models::users::UserStatusUpdate,
            api::models::profiles::ServiceCategory,
            api::models::profiles::ProfileCreate,
            api::models::profiles::ProfileUpdate,
            api::models::profiles::ProfileVerification,
            api::models::profiles::ProfileResponse,
            api::models::requests::LeadStatus,
            api::models::requests::Urgency,
            api::models::requests::Submitter,
            api::models::requests::RequestCreate,
            api::models::requests::QuickRequestCreate,
            api::models::requests::RequestUpdate,
            api::models::requests::RequestResponse,
            api::models::leads::LeadResponse,
            api::models::leads::LeadStatusUpdate,
            api::models::leads::LeadAssign,
            api::models::leads::LeadPreview,
            api::models::leads::ContactDetails,
            api::models::leads::LeadViewResponse,
            api::models::credits::CreditPackage,
            api::models::credits::PackageResponse,
            api::models::credits::PackagesResponse,
            api::models::credits::BalanceResponse,
            api::models::credits::PurchaseRequest,
            api::models::credits::PurchaseResponse,
            api::models::credits::PaymentStatusResponse,
            api::models::credits::CreditTransactionResponse,
            api::models::credits::TransactionsResponse,
            api::models::chat::ChatRequest,
            api::models::chat::ChatResponse,
            api::models::chat::ChatMessageResponse,
            api::models::chat::ChatHistoryResponse,
            api::models::chat::ChatSessionResponse,
            api::models::chat::ChatSessionsResponse,
            api::models::reviews::ReviewCreate,
            api::models::reviews::ReviewCreated,
            api::models::reviews::ReviewResponse,
            api::models::admin::UserStats,
            api::models::admin::ProfileStats,
            api::models::admin::RequestStats,
            api::models::admin::LeadStats,
            api::models::admin::RecentActivity,
            api::models::admin::PlatformStatsResponse,
            api::models::admin::MessageResponse,
            db::models::payments::PaymentStatus,
            db::models::credits::CreditTransactionType,
            db::models::chat::ChatRole,
        )
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Registration, login and the caller's account"),
        (name = "professionals", description = "Business profiles, lead previews and unlocks"),
        (name = "customers", description = "Service requests"),
        (name = "admin", description = "Platform administration"),
        (name = "credits", description = "Credit packages, balance and checkout"),
        (name = "webhooks", description = "Payment provider callbacks"),
        (name = "chat", description = "Assistant conversations"),
        (name = "reviews", description = "Reviews of professionals"),
    ),
    info(
        title = "Lead Marketplace API",
        version = "1.0.0",
        description = "Connects customers posting service requests with professionals who buy credits to unlock them."
    )
)]
pub struct ApiDoc;
