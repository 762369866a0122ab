use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    handlers::routes()
}

pub fn directory_router() -> Router<AppState> {
    handlers::directory_routes()
}
