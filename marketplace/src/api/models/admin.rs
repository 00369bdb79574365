use crate::{
    api::models::{requests::RequestResponse, users::UserResponse},
    db::handlers::stats::PlatformCounts,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserStats {
    pub total_users: i64,
    pub total_professionals: i64,
    pub total_customers: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileStats {
    pub total_profiles: i64,
    pub verified_profiles: i64,
    /// Percentage of profiles that are verified
    pub verification_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestStats {
    pub total_requests: i64,
    pub pending_requests: i64,
    /// Percentage of requests that have left `pending`
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeadStats {
    pub total_leads: i64,
    /// Leads that are assigned, contacted or in progress
    pub active_leads: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecentActivity {
    pub recent_requests: Vec<RequestResponse>,
    pub recent_registrations: Vec<UserResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlatformStatsResponse {
    pub user_stats: UserStats,
    pub profile_stats: ProfileStats,
    pub request_stats: RequestStats,
    pub lead_stats: LeadStats,
    pub recent_activity: RecentActivity,
}

fn percentage(part: i64, whole: i64) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64 * 100.0
    } else {
        0.0
    }
}

impl PlatformStatsResponse {
    pub fn new(counts: PlatformCounts, recent_activity: RecentActivity) -> Self {
        Self {
            user_stats: UserStats {
                total_users: counts.total_users,
                total_professionals: counts.total_professionals,
                total_customers: counts.total_customers,
            },
            profile_stats: ProfileStats {
                total_profiles: counts.total_profiles,
                verified_profiles: counts.verified_profiles,
                verification_rate: percentage(counts.verified_profiles, counts.total_profiles),
            },
            request_stats: RequestStats {
                total_requests: counts.total_requests,
                pending_requests: counts.pending_requests,
                conversion_rate: percentage(counts.total_requests - counts.pending_requests, counts.total_requests),
            },
            lead_stats: LeadStats {
                total_leads: counts.total_leads,
                active_leads: counts.active_leads,
            },
            recent_activity,
        }
    }
}

/// Plain acknowledgement body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
