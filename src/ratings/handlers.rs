use axum::{
    extract::{Extension, Path, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthAccount, error::AppError, ratings::repo, role::Role, state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/:id/ratings", post(rate_mentor))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRequest {
    pub rating: i32,
    #[serde(default)]
    pub review: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateResponse {
    pub new_average: f64,
    pub total_reviews: i32,
}

pub(crate) fn is_valid_rating(value: i32) -> bool {
    (1..=5).contains(&value)
}

/// Rating is the mentee side of the exchange; a mentor token is rejected.
pub(crate) fn may_rate(token_role: Role) -> bool {
    token_role == Role::Mentee
}

#[instrument(skip(state, payload))]
pub async fn rate_mentor(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    AuthAccount(rater_id, token_role): AuthAccount,
    Path(mentor_id): Path<Uuid>,
    Json(payload): Json<RateRequest>,
) -> Result<Json<RateResponse>, AppError> {
    if !may_rate(token_role) {
        warn!(%rater_id, %token_role, "non-mentee token on rating endpoint");
        return Err(AppError::Auth("Only mentees may rate mentors".into()));
    }
    if !is_valid_rating(payload.rating) {
        warn!(rating = payload.rating, "rating out of range");
        return Err(AppError::Validation(
            "Rating must be between 1 and 5".into(),
        ));
    }

    let review = payload
        .review
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let (new_average, total_reviews) =
        repo::apply_rating(state.db(role), mentor_id, payload.rating, review)
            .await?
            .ok_or_else(|| AppError::NotFound("Mentor not found".into()))?;

    info!(%mentor_id, %rater_id, rating = payload.rating, new_average, total_reviews, "rating applied");
    Ok(Json(RateResponse {
        new_average,
        total_reviews,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        assert!(!is_valid_rating(0));
        assert!(is_valid_rating(1));
        assert!(is_valid_rating(5));
        assert!(!is_valid_rating(6));
        assert!(!is_valid_rating(-1));
    }

    #[test]
    fn only_mentee_tokens_may_rate() {
        assert!(may_rate(Role::Mentee));
        assert!(!may_rate(Role::Mentor));
    }

    #[test]
    fn response_uses_camel_case() {
        let json = serde_json::to_string(&RateResponse {
            new_average: 4.5,
            total_reviews: 2,
        })
        .unwrap();
        assert!(json.contains("\"newAverage\":4.5"));
        assert!(json.contains("\"totalReviews\":2"));
    }
}
