use axum::{
    extract::{Extension, FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{error, info, instrument, warn};

use crate::{
    accounts::{
        dto::PublicAccount,
        handlers::resolve_photo_url,
        repo::{Account, NewAccount},
    },
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse,
            ResetPasswordRequest, SignupRequest,
        },
        jwt::{AuthAccount, JwtKeys},
        otp::{check_challenge, generate_code, ChallengeCheck},
        password::{hash_password, verify_password},
    },
    error::AppError,
    role::Role,
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_url(url: &str) -> bool {
    lazy_static! {
        static ref URL_RE: Regex = Regex::new(r"^https?://[^\s/]+\.[^\s]+$").unwrap();
    }
    URL_RE.is_match(url)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/session", get(session))
        .route("/password/forgot", post(forgot_password))
        .route("/password/reset", post(reset_password))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    if payload.password.len() < 6 {
        warn!("password too short");
        return Err(AppError::Validation("Password too short".into()));
    }
    if payload.password != payload.confirm_password {
        warn!("password confirmation mismatch");
        return Err(AppError::Validation("Passwords do not match".into()));
    }
    if payload.full_name.trim().is_empty() {
        return Err(AppError::Validation("Full name is required".into()));
    }
    if let Some(url) = payload.scheduling_url.as_deref() {
        if !is_valid_url(url) {
            warn!("malformed scheduling url");
            return Err(AppError::Validation("Invalid scheduling URL".into()));
        }
    }
    if role == Role::Mentor {
        let missing_expertise = payload
            .expertise
            .as_deref()
            .map(|s| s.trim().is_empty())
            .unwrap_or(true);
        if missing_expertise || payload.experience_years.is_none() {
            warn!("mentor signup missing expertise/experience");
            return Err(AppError::Validation(
                "Expertise and experience are required for mentors".into(),
            ));
        }
    }

    let db = state.db(role);
    if Account::find_by_email(db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    let account = Account::create(
        db,
        &NewAccount {
            email: &payload.email,
            password_hash: &hash,
            full_name: payload.full_name.trim(),
            bio: payload.bio.as_deref(),
            skills: payload.skills.as_deref(),
            job_title: payload.job_title.as_deref(),
            company: payload.company.as_deref(),
            expertise: payload.expertise.as_deref(),
            experience_years: payload.experience_years,
            scheduling_url: payload.scheduling_url.as_deref(),
        },
    )
    .await?
    .ok_or_else(|| {
        // Lost a race with a concurrent signup for the same email.
        warn!(email = %payload.email, "email already registered");
        AppError::Conflict("Email already registered".into())
    })?;

    info!(account_id = %account.id, email = %account.email, %role, "account created");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Account created")),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }

    let db = state.db(role);
    let account = Account::find_by_email(db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            AppError::NotFound("No account found for this email".into())
        })?;

    if !verify_password(&payload.password, &account.password_hash)? {
        warn!(email = %payload.email, account_id = %account.id, "login invalid password");
        return Err(AppError::Auth("Invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(account.id, role)?;

    info!(account_id = %account.id, email = %account.email, %role, "logged in");
    let photo_url = resolve_photo_url(&state, account.photo_key.as_deref()).await;
    Ok(Json(AuthResponse {
        token,
        user: PublicAccount::from_account(account, photo_url),
    }))
}

/// Resolve the bearer token to the stored profile.
#[instrument(skip(state))]
pub async fn session(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    AuthAccount(account_id, token_role): AuthAccount,
) -> Result<Json<PublicAccount>, AppError> {
    if token_role != role {
        warn!(account_id = %account_id, %token_role, "token presented to wrong role group");
        return Err(AppError::Auth("Token does not match this role".into()));
    }

    let account = Account::find_by_id(state.db(role), account_id)
        .await?
        .ok_or_else(|| {
            warn!(account_id = %account_id, "session for missing account");
            AppError::Auth("Account not found".into())
        })?;

    let photo_url = resolve_photo_url(&state, account.photo_key.as_deref()).await;
    Ok(Json(PublicAccount::from_account(account, photo_url)))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();

    let account = Account::find_by_email(state.db(role), &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "reset requested for unknown email");
            AppError::NotFound("No account found for this email".into())
        })?;

    let code = generate_code();
    let expires_at =
        OffsetDateTime::now_utc() + Duration::minutes(state.config.otp_ttl_minutes);
    state.otp.put(role, &payload.email, &code, expires_at).await?;

    info!(account_id = %account.id, %role, "reset code issued");

    // The challenge stays valid even when dispatch fails; the user can retry
    // the email without invalidating an already-delivered code.
    if let Err(e) = state
        .mailer
        .send_otp(&payload.email, &code, state.config.otp_ttl_minutes)
        .await
    {
        error!(error = %e, email = %payload.email, "reset email dispatch failed");
        return Err(AppError::Delivery("Failed to send reset email".into()));
    }

    Ok(Json(MessageResponse::new("Reset code sent")))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    Json(mut payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.new_password.len() < 6 {
        return Err(AppError::Validation("Password too short".into()));
    }

    let db = state.db(role);
    let account = Account::find_by_email(db, &payload.email)
        .await?
        .ok_or_else(|| AppError::NotFound("No account found for this email".into()))?;

    let challenge = state
        .otp
        .get(role, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "reset without live challenge");
            AppError::NotFound("No reset request found for this email".into())
        })?;

    match check_challenge(&challenge, &payload.code, OffsetDateTime::now_utc()) {
        ChallengeCheck::Expired => {
            if let Err(e) = state.otp.delete(role, &payload.email).await {
                warn!(error = %e, email = %payload.email, "stale challenge cleanup failed");
            }
            return Err(AppError::Validation("Reset code expired".into()));
        }
        ChallengeCheck::Mismatch => {
            warn!(email = %payload.email, "reset code mismatch");
            return Err(AppError::Validation("Invalid reset code".into()));
        }
        ChallengeCheck::Valid => {}
    }

    // Consume before updating: the conditional delete makes a concurrent
    // duplicate reset lose instead of double-applying.
    if !state.otp.consume(role, &payload.email, &payload.code).await? {
        return Err(AppError::NotFound(
            "No reset request found for this email".into(),
        ));
    }

    let hash = hash_password(&payload.new_password)?;
    Account::update_password(db, account.id, &hash).await?;

    info!(account_id = %account.id, %role, "password reset");
    Ok(Json(MessageResponse::new("Password updated")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
        assert!(!is_valid_email("missing-at.com"));
        assert!(!is_valid_email("no@tld"));
        assert!(!is_valid_email("spaces in@mail.com"));
    }

    #[test]
    fn scheduling_url_validation() {
        assert!(is_valid_url("https://calendly.com/jordan/30min"));
        assert!(is_valid_url("http://cal.example.org/book"));
        assert!(!is_valid_url("not a url"));
        assert!(!is_valid_url("calendly.com/jordan"));
        assert!(!is_valid_url("ftp://files.example.org/slot"));
        assert!(!is_valid_url(""));
    }

    #[test]
    fn signup_request_accepts_minimal_payload() {
        let payload: SignupRequest = serde_json::from_str(
            r#"{"fullName":"A B","email":"a@b.com","password":"secret1",
                "confirmPassword":"secret1"}"#,
        )
        .unwrap();
        assert_eq!(payload.full_name, "A B");
        assert_eq!(payload.confirm_password, "secret1");
        assert!(payload.expertise.is_none());
    }
}
