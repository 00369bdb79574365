use crate::{
    db::models::{
        credits::{BalanceSummary, CreditTransactionDBResponse, CreditTransactionType},
        payments::PaymentStatus,
    },
    types::{LeadId, TransactionId, UserId},
};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Purchasable credit bundles. The wire names are historical and do not
/// match the credit counts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text")]
pub enum CreditPackage {
    #[serde(rename = "starter_10")]
    #[sqlx(rename = "starter_10")]
    Starter,
    #[serde(rename = "basic_25")]
    #[sqlx(rename = "basic_25")]
    Basic,
    #[serde(rename = "professional_50")]
    #[sqlx(rename = "professional_50")]
    Professional,
    #[serde(rename = "premium_100")]
    #[sqlx(rename = "premium_100")]
    Premium,
    #[serde(rename = "business_250")]
    #[sqlx(rename = "business_250")]
    Business,
    #[serde(rename = "enterprise_500")]
    #[sqlx(rename = "enterprise_500")]
    Enterprise,
}

/// Price list entry for a package
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackageDetails {
    pub credits: i64,
    pub price: Decimal,
    pub name: &'static str,
    pub description: &'static str,
}

impl CreditPackage {
    pub const ALL: [CreditPackage; 6] = [
        CreditPackage::Starter,
        CreditPackage::Basic,
        CreditPackage::Professional,
        CreditPackage::Premium,
        CreditPackage::Business,
        CreditPackage::Enterprise,
    ];

    pub fn details(self) -> PackageDetails {
        match self {
            CreditPackage::Starter => PackageDetails {
                credits: 3,
                price: Decimal::new(15000, 2),
                name: "Tester Pack",
                description: "Perfect for testing the platform",
            },
            CreditPackage::Basic => PackageDetails {
                credits: 25,
                price: Decimal::new(49900, 2),
                name: "777 Pack",
                description: "Great for small businesses",
            },
            CreditPackage::Professional => PackageDetails {
                credits: 20,
                price: Decimal::new(150000, 2),
                name: "Elite Pack",
                description: "20 Exclusive leads for growing businesses",
            },
            CreditPackage::Premium => PackageDetails {
                credits: 30,
                price: Decimal::new(200000, 2),
                name: "Pro Pack",
                description: "30 Exclusive leads for active professionals",
            },
            CreditPackage::Business => PackageDetails {
                credits: 100,
                price: Decimal::new(600000, 2),
                name: "Premium Deluxe",
                description: "For established businesses",
            },
            CreditPackage::Enterprise => PackageDetails {
                credits: 200,
                price: Decimal::new(1325000, 2),
                name: "Enterprise Deluxe",
                description: "200 quality leads for large operations",
            },
        }
    }

    /// Wire name, as used in checkout metadata and transaction descriptions
    pub fn as_str(self) -> &'static str {
        match self {
            CreditPackage::Starter => "starter_10",
            CreditPackage::Basic => "basic_25",
            CreditPackage::Professional => "professional_50",
            CreditPackage::Premium => "premium_100",
            CreditPackage::Business => "business_250",
            CreditPackage::Enterprise => "enterprise_500",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PackageResponse {
    pub package_type: CreditPackage,
    pub credits: i64,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub name: String,
    pub description: String,
    #[schema(value_type = f64)]
    pub price_per_credit: Decimal,
}

impl From<CreditPackage> for PackageResponse {
    fn from(package: CreditPackage) -> Self {
        let details = package.details();
        Self {
            package_type: package,
            credits: details.credits,
            price: details.price,
            name: details.name.to_string(),
            description: details.description.to_string(),
            price_per_credit: (details.price / Decimal::from(details.credits))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PackagesResponse {
    pub packages: Vec<PackageResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub balance: i64,
    pub total_purchased: i64,
    pub total_used: i64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl BalanceResponse {
    pub fn new(user_id: UserId, summary: BalanceSummary) -> Self {
        Self {
            user_id,
            balance: summary.balance,
            total_purchased: summary.total_purchased,
            total_used: summary.total_used,
            last_updated: summary.last_updated,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchaseRequest {
    pub package_type: CreditPackage,
    /// Frontend origin the checkout redirects back to
    pub origin_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchaseResponse {
    pub checkout_url: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentStatusResponse {
    /// The stored payment status (`initiated`, `pending`, `completed`, `failed`, `expired`), not the
    /// provider's raw `paid`/`unpaid` value
    pub payment_status: PaymentStatus,
    pub credits_added: i64,
    pub new_balance: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreditTransactionResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: TransactionId,
    pub transaction_type: CreditTransactionType,
    /// Always positive; the type gives the direction
    pub amount: i64,
    pub balance_after: i64,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub lead_id: Option<LeadId>,
    pub payment_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CreditTransactionDBResponse> for CreditTransactionResponse {
    fn from(db: CreditTransactionDBResponse) -> Self {
        Self {
            id: db.id,
            transaction_type: db.transaction_type,
            amount: db.amount,
            balance_after: db.balance_after,
            description: db.description,
            lead_id: db.lead_id,
            payment_session_id: db.payment_session_id,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionsResponse {
    pub transactions: Vec<CreditTransactionResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_per_credit_is_rounded() {
        let starter = PackageResponse::from(CreditPackage::Starter);
        assert_eq!(starter.price_per_credit, Decimal::new(5000, 2));

        let basic = PackageResponse::from(CreditPackage::Basic);
        assert_eq!(basic.price_per_credit, Decimal::new(1996, 2));

        let enterprise = PackageResponse::from(CreditPackage::Enterprise);
        assert_eq!(enterprise.price_per_credit, Decimal::new(6625, 2));
    }

    #[test]
    fn test_package_wire_names() {
        for package in CreditPackage::ALL {
            let json = serde_json::to_value(package).unwrap();
            assert_eq!(json, package.as_str());
        }
        assert!(serde_json::from_str::<CreditPackage>("\"platinum_1000\"").is_err());
    }

    #[test]
    fn test_payment_status_uses_stored_names() {
        let response = PaymentStatusResponse {
            payment_status: PaymentStatus::Completed,
            credits_added: 3,
            new_balance: 3,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["payment_status"], "completed");

        let pending = serde_json::to_value(PaymentStatus::Pending).unwrap();
        assert_eq!(pending, "pending");
        assert!(serde_json::from_str::<PaymentStatus>("\"paid\"").is_err());
    }
}
