use axum::{
    extract::{DefaultBodyLimit, Extension, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    auth::{dto::MessageResponse, jwt::AuthAccount},
    error::AppError,
    photos::services::{image_ext, remove_profile_photo, store_profile_photo},
    role::Role,
    state::AppState,
};

// The 5MB cap is enforced per file below; the body limit only needs to
// bound the whole multipart envelope.
const BODY_LIMIT: usize = 8 * 1024 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/photo", post(upload_photo).delete(remove_photo))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoResponse {
    pub message: String,
    pub photo_url: Option<String>,
}

#[instrument(skip(state, multipart))]
pub async fn upload_photo(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    AuthAccount(account_id, token_role): AuthAccount,
    mut multipart: Multipart,
) -> Result<Json<PhotoResponse>, AppError> {
    if token_role != role {
        return Err(AppError::Auth("Token does not match this role".into()));
    }

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::Validation("Malformed multipart body".into()))?
    {
        if field.name() != Some("profilePhoto") {
            continue;
        }

        let filename = field.file_name().map(|s| s.to_string());
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());

        let Some(ext) = image_ext(filename.as_deref(), Some(&content_type)) else {
            warn!(?filename, %content_type, "rejected upload type");
            return Err(AppError::Validation(
                "Only jpg, jpeg, png, gif and webp images are allowed".into(),
            ));
        };

        let data = field
            .bytes()
            .await
            .map_err(|_| AppError::Validation("Malformed multipart body".into()))?;
        if data.len() > state.config.max_upload_bytes {
            warn!(size = data.len(), "upload too large");
            return Err(AppError::Validation("File too large (max 5MB)".into()));
        }

        let key = store_profile_photo(&state, role, account_id, ext, &content_type, data)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not found".into()))?;

        info!(%account_id, %role, %key, "profile photo uploaded");
        let photo_url = state.storage.url_for(&key).await.ok();
        return Ok(Json(PhotoResponse {
            message: "Photo uploaded".into(),
            photo_url,
        }));
    }

    Err(AppError::Validation("profilePhoto field is required".into()))
}

#[instrument(skip(state))]
pub async fn remove_photo(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    AuthAccount(account_id, token_role): AuthAccount,
) -> Result<Json<MessageResponse>, AppError> {
    if token_role != role {
        return Err(AppError::Auth("Token does not match this role".into()));
    }

    if !remove_profile_photo(&state, role, account_id).await? {
        return Err(AppError::NotFound("Account not found".into()));
    }

    info!(%account_id, %role, "profile photo removed");
    Ok(Json(MessageResponse::new("Photo removed")))
}
