use crate::{
    db::models::reviews::{AuthoredReviewDBResponse, ReviewDBResponse},
    types::{ReviewId, UserId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewCreate {
    /// User id of the reviewed professional
    #[schema(value_type = String, format = "uuid")]
    pub professional_id: UserId,
    #[serde(deserialize_with = "star_rating")]
    #[schema(minimum = 1, maximum = 5)]
    pub rating: i32,
    pub title: String,
    pub comment: String,
}

/// Out-of-range ratings fail deserialization, which axum reports as 422
fn star_rating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let rating = i32::deserialize(deserializer)?;
    if (1..=5).contains(&rating) {
        Ok(rating)
    } else {
        Err(serde::de::Error::custom(format!("rating must be between 1 and 5, got {rating}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewCreated {
    pub message: String,
    #[schema(value_type = String, format = "uuid")]
    pub review_id: ReviewId,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ReviewId,
    #[schema(value_type = String, format = "uuid")]
    pub customer_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub professional_id: UserId,
    pub rating: i32,
    pub title: String,
    pub comment: String,
    pub customer_name: String,
    pub created_at: DateTime<Utc>,
    /// Business name of the reviewed professional, on the author's own listing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub professional_name: Option<String>,
}

impl From<ReviewDBResponse> for ReviewResponse {
    fn from(db: ReviewDBResponse) -> Self {
        Self {
            id: db.id,
            customer_id: db.customer_id,
            professional_id: db.professional_id,
            rating: db.rating,
            title: db.title,
            comment: db.comment,
            customer_name: db.customer_name,
            created_at: db.created_at,
            professional_name: None,
        }
    }
}

impl From<AuthoredReviewDBResponse> for ReviewResponse {
    fn from(db: AuthoredReviewDBResponse) -> Self {
        Self {
            professional_name: db.professional_name,
            ..Self::from(db.review)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rating_bounds() {
        let professional_id = uuid::Uuid::new_v4();
        let body = |rating: i32| json!({ "professional_id": professional_id, "rating": rating, "title": "t", "comment": "c" });

        assert!(serde_json::from_value::<ReviewCreate>(body(1)).is_ok());
        assert!(serde_json::from_value::<ReviewCreate>(body(5)).is_ok());
        assert!(serde_json::from_value::<ReviewCreate>(body(0)).is_err());
        assert!(serde_json::from_value::<ReviewCreate>(body(6)).is_err());
    }
}
