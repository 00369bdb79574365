use crate::{
    api::models::{
        admin::MessageResponse,
        reviews::{ReviewCreate, ReviewCreated, ReviewResponse},
        users::CurrentUser,
    },
    auth::permissions::{can_delete_all_resources, can_delete_own_resource, operation, resource, RequiresPermission},
    db::{
        handlers::{Profiles, Reviews},
        models::reviews::ReviewCreateDBRequest,
    },
    errors::{Error, Result},
    types::{Resource, ReviewId, UserId},
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::info;

const REVIEW_PAIR_CONSTRAINT: &str = "reviews_customer_professional_key";
const REVIEWS_LIMIT: i64 = 50;

#[utoipa::path(
    post,
    path = "/reviews",
    tag = "reviews",
    summary = "Review a professional",
    request_body = ReviewCreate,
    responses(
        (status = 201, description = "Review created", body = ReviewCreated),
        (status = 400, description = "Professional already reviewed by the caller"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Customers only"),
        (status = 404, description = "Professional not found"),
        (status = 422, description = "Rating outside 1-5"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_review(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Reviews, operation::CreateOwn>,
    Json(review): Json<ReviewCreate>,
) -> Result<(StatusCode, Json<ReviewCreated>)> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    if Profiles::new(&mut conn).get_by_user_id(review.professional_id).await?.is_none() {
        return Err(Error::NotFound {
            resource: "Professional".to_string(),
            id: review.professional_id.to_string(),
        });
    }

    let created = Reviews::new(&mut conn)
        .create(&ReviewCreateDBRequest {
            customer_id: current_user.id,
            professional_id: review.professional_id,
            rating: review.rating,
            title: review.title,
            comment: review.comment,
            customer_name: current_user.full_name(),
        })
        .await
        .map_err(|e| {
            if e.is_unique_violation_on(REVIEW_PAIR_CONSTRAINT) {
                Error::BadRequest {
                    message: "You have already reviewed this professional".to_string(),
                }
            } else {
                e.into()
            }
        })?;

    info!(review_id = %created.id, professional_id = %created.professional_id, rating = created.rating, "review posted");
    Ok((
        StatusCode::CREATED,
        Json(ReviewCreated {
            message: "Review created successfully".to_string(),
            review_id: created.id,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/reviews/my-reviews",
    tag = "reviews",
    summary = "Reviews written by the caller",
    responses(
        (status = 200, description = "Reviews with the professional's business name, newest first", body = [ReviewResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Customers only"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_my_reviews(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Reviews, operation::ReadOwn>,
) -> Result<Json<Vec<ReviewResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let reviews = Reviews::new(&mut conn).list_by_customer(current_user.id, REVIEWS_LIMIT).await?;

    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}

#[utoipa::path(
    delete,
    path = "/reviews/{review_id}",
    tag = "reviews",
    summary = "Delete a review",
    description = "Authors may delete their own reviews; admins may delete any.",
    params(("review_id" = String, Path, description = "Review ID (UUID)")),
    responses(
        (status = 200, description = "Review deleted", body = MessageResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Review not found"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_review(
    State(state): State<AppState>,
    Path(review_id): Path<ReviewId>,
    current_user: CurrentUser,
) -> Result<Json<MessageResponse>> {
    let not_found = || Error::NotFound {
        resource: "Review".to_string(),
        id: review_id.to_string(),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let review = Reviews::new(&mut conn).get_by_id(review_id).await?.ok_or_else(not_found)?;

    let allowed = can_delete_all_resources(&current_user, Resource::Reviews)
        || can_delete_own_resource(&current_user, Resource::Reviews, review.customer_id);
    if !allowed {
        return Err(Error::Forbidden {
            message: "You can only delete your own reviews".to_string(),
        });
    }

    Reviews::new(&mut conn).delete(review_id).await?.ok_or_else(not_found)?;

    info!(%review_id, deleted_by = %current_user.id, "review deleted");
    Ok(Json(MessageResponse::new("Review deleted successfully")))
}

#[utoipa::path(
    get,
    path = "/professionals/{professional_id}/reviews",
    tag = "reviews",
    summary = "Reviews of a professional",
    params(("professional_id" = String, Path, description = "Professional user ID (UUID)")),
    responses(
        (status = 200, description = "Reviews, newest first", body = [ReviewResponse]),
    )
)]
pub async fn list_professional_reviews(
    State(state): State<AppState>,
    Path(professional_id): Path<UserId>,
) -> Result<Json<Vec<ReviewResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let reviews = Reviews::new(&mut conn)
        .list_for_professional(professional_id, REVIEWS_LIMIT)
        .await?;

    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::models::{
            profiles::{ProfileResponse, ServiceCategory},
            users::UserType,
        },
        test_utils::*,
    };
    use rust_decimal::Decimal;
    use serde_json::json;
    use sqlx::PgPool;

    fn review_body(professional_id: UserId, rating: i32) -> serde_json::Value {
        json!({
            "professional_id": professional_id,
            "rating": rating,
            "title": "Solid work",
            "comment": "Showed up on time and cleaned up after"
        })
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_reviews_update_rating(pool: PgPool) {
        let (app, _) = create_test_app(pool.clone()).await;
        let pro = create_test_user(&pool, UserType::Professional).await;
        let profile = create_test_profile(&pool, pro.id, vec![ServiceCategory::Roofing]).await;
        let first = create_test_user(&pool, UserType::Customer).await;
        let second = create_test_user(&pool, UserType::Customer).await;

        for (customer, rating) in [(&first, 5), (&second, 4)] {
            let (name, value) = add_auth_headers(customer);
            app.post("/api/reviews")
                .add_header(name, value)
                .json(&review_body(pro.id, rating))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let profile_after: ProfileResponse = app.get(&format!("/api/professionals/{}", pro.id)).await.json();
        assert_eq!(profile_after.id, profile.id);
        assert_eq!(profile_after.review_count, 2);
        assert_eq!(profile_after.rating, Decimal::new(450, 2));

        let public: Vec<ReviewResponse> = app.get(&format!("/api/professionals/{}/reviews", pro.id)).await.json();
        assert_eq!(public.len(), 2);
        assert!(public.iter().all(|review| review.customer_name == "Test Customer"));

        let (name, value) = add_auth_headers(&first);
        let mine: Vec<ReviewResponse> = app.get("/api/reviews/my-reviews").add_header(name, value).await.json();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].professional_name.as_deref(), Some(profile.business_name.as_str()));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_review_validation(pool: PgPool) {
        let (app, _) = create_test_app(pool.clone()).await;
        let pro = create_test_user(&pool, UserType::Professional).await;
        create_test_profile(&pool, pro.id, vec![ServiceCategory::Cleaning]).await;
        let customer = create_test_user(&pool, UserType::Customer).await;
        let (name, value) = add_auth_headers(&customer);

        app.post("/api/reviews")
            .add_header(name.clone(), value.clone())
            .json(&review_body(pro.id, 6))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        let unknown = app
            .post("/api/reviews")
            .add_header(name.clone(), value.clone())
            .json(&review_body(uuid::Uuid::new_v4(), 3))
            .await;
        unknown.assert_status_not_found();
        assert_eq!(unknown.json::<serde_json::Value>()["detail"], "Professional not found");

        app.post("/api/reviews")
            .add_header(name.clone(), value.clone())
            .json(&review_body(pro.id, 3))
            .await
            .assert_status(StatusCode::CREATED);
        let duplicate = app
            .post("/api/reviews")
            .add_header(name, value)
            .json(&review_body(pro.id, 1))
            .await;
        duplicate.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            duplicate.json::<serde_json::Value>()["detail"],
            "You have already reviewed this professional"
        );

        let (name, value) = add_auth_headers(&pro);
        app.post("/api/reviews")
            .add_header(name, value)
            .json(&review_body(pro.id, 5))
            .await
            .assert_status_forbidden();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_review_permissions(pool: PgPool) {
        let (app, _) = create_test_app(pool.clone()).await;
        let pro = create_test_user(&pool, UserType::Professional).await;
        create_test_profile(&pool, pro.id, vec![ServiceCategory::Painter]).await;
        let author = create_test_user(&pool, UserType::Customer).await;
        let stranger = create_test_user(&pool, UserType::Customer).await;
        let admin = create_test_user(&pool, UserType::Admin).await;

        let mut review_ids = Vec::new();
        for _ in 0..2 {
            let customer = create_test_user(&pool, UserType::Customer).await;
            let (name, value) = add_auth_headers(&customer);
            let created: ReviewCreated = app
                .post("/api/reviews")
                .add_header(name, value)
                .json(&review_body(pro.id, 2))
                .await
                .json();
            review_ids.push((customer, created.review_id));
        }
        let (name, value) = add_auth_headers(&author);
        let authored: ReviewCreated = app
            .post("/api/reviews")
            .add_header(name.clone(), value.clone())
            .json(&review_body(pro.id, 5))
            .await
            .json();

        let (stranger_name, stranger_value) = add_auth_headers(&stranger);
        let denied = app
            .delete(&format!("/api/reviews/{}", authored.review_id))
            .add_header(stranger_name, stranger_value)
            .await;
        denied.assert_status_forbidden();
        assert_eq!(denied.json::<serde_json::Value>()["detail"], "You can only delete your own reviews");

        app.delete(&format!("/api/reviews/{}", authored.review_id))
            .add_header(name.clone(), value.clone())
            .await
            .assert_status_ok();
        app.delete(&format!("/api/reviews/{}", authored.review_id))
            .add_header(name, value)
            .await
            .assert_status_not_found();

        let (admin_name, admin_value) = add_auth_headers(&admin);
        app.delete(&format!("/api/reviews/{}", review_ids[0].1))
            .add_header(admin_name, admin_value)
            .await
            .assert_status_ok();

        let profile: ProfileResponse = app.get(&format!("/api/professionals/{}", pro.id)).await.json();
        assert_eq!(profile.review_count, 1);
        assert_eq!(profile.rating, Decimal::new(200, 2));

        app.delete(&format!("/api/reviews/{}", review_ids[1].1)).await.assert_status_unauthorized();
    }
}
