use axum::Router;

use crate::state::AppState;

pub mod claims;
pub mod dto;
pub mod handlers;
pub mod jwt;
pub mod otp;
pub mod password;

/// Signup, login, session and password-reset routes for one role group.
pub fn router() -> Router<AppState> {
    handlers::routes()
}
