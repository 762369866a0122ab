use axum::{
    extract::{Extension, Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    accounts::{
        dto::{MentorDetail, PublicAccount, SearchQuery, UpdateProfileRequest},
        repo::Account,
    },
    auth::{dto::MessageResponse, handlers::is_valid_url, jwt::AuthAccount},
    error::AppError,
    ratings,
    role::Role,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/profile",
        get(get_profile).put(update_profile).delete(delete_account),
    )
}

/// Public mentor directory; mounted only under the mentor group.
pub fn directory_routes() -> Router<AppState> {
    Router::new()
        .route("/browse", get(browse))
        .route("/search", get(search))
        .route("/:id", get(mentor_detail))
}

pub(crate) async fn resolve_photo_url(state: &AppState, key: Option<&str>) -> Option<String> {
    let key = key?;
    match state.storage.url_for(key).await {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(error = %e, %key, "photo url resolution failed");
            None
        }
    }
}

fn require_role(token_role: Role, mounted: Role) -> Result<(), AppError> {
    if token_role != mounted {
        return Err(AppError::Auth("Token does not match this role".into()));
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    AuthAccount(account_id, token_role): AuthAccount,
) -> Result<Json<PublicAccount>, AppError> {
    require_role(token_role, role)?;

    let account = Account::find_by_id(state.db(role), account_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Account not found".into()))?;

    let photo_url = resolve_photo_url(&state, account.photo_key.as_deref()).await;
    Ok(Json(PublicAccount::from_account(account, photo_url)))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    AuthAccount(account_id, token_role): AuthAccount,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<PublicAccount>, AppError> {
    require_role(token_role, role)?;

    if let Some(name) = payload.full_name.as_deref() {
        if name.trim().is_empty() {
            return Err(AppError::Validation("Full name cannot be empty".into()));
        }
    }
    if let Some(url) = payload.scheduling_url.as_deref() {
        if !is_valid_url(url) {
            warn!("malformed scheduling url");
            return Err(AppError::Validation("Invalid scheduling URL".into()));
        }
    }

    let account = Account::update_profile(state.db(role), account_id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound("Account not found".into()))?;

    info!(account_id = %account.id, %role, "profile updated");
    let photo_url = resolve_photo_url(&state, account.photo_key.as_deref()).await;
    Ok(Json(PublicAccount::from_account(account, photo_url)))
}

#[instrument(skip(state))]
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    AuthAccount(account_id, token_role): AuthAccount,
) -> Result<Json<MessageResponse>, AppError> {
    require_role(token_role, role)?;

    let photo_key = Account::delete(state.db(role), account_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Account not found".into()))?;

    // Storage cleanup is best-effort; a dangling file is harmless.
    if let Some(key) = photo_key {
        if let Err(e) = state.storage.delete_object(&key).await {
            warn!(error = %e, %key, "photo cleanup after account delete failed");
        }
    }

    info!(%account_id, %role, "account deleted");
    Ok(Json(MessageResponse::new("Account deleted")))
}

#[instrument(skip(state))]
pub async fn browse(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
) -> Result<Json<Vec<PublicAccount>>, AppError> {
    let accounts = Account::browse(state.db(role)).await?;
    let mut items = Vec::with_capacity(accounts.len());
    for account in accounts {
        let photo_url = resolve_photo_url(&state, account.photo_key.as_deref()).await;
        items.push(PublicAccount::from_account(account, photo_url));
    }
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<PublicAccount>>, AppError> {
    let accounts = Account::search(state.db(role), &params.q).await?;
    let mut items = Vec::with_capacity(accounts.len());
    for account in accounts {
        let photo_url = resolve_photo_url(&state, account.photo_key.as_deref()).await;
        items.push(PublicAccount::from_account(account, photo_url));
    }
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn mentor_detail(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    Path(id): Path<Uuid>,
) -> Result<Json<MentorDetail>, AppError> {
    let db = state.db(role);
    let account = Account::find_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Mentor not found".into()))?;

    let testimonials = ratings::repo::list_testimonials(db, id).await?;
    let photo_url = resolve_photo_url(&state, account.photo_key.as_deref()).await;

    Ok(Json(MentorDetail {
        profile: PublicAccount::from_account(account, photo_url),
        testimonials: testimonials.into_iter().map(Into::into).collect(),
    }))
}
