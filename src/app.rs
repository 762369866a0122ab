use std::net::SocketAddr;

use axum::{routing::get, Extension, Router};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::role::Role;
use crate::state::AppState;
use crate::{accounts, auth, photos, ratings};

/// One role-parameterized route group; the same handlers serve both sides of
/// the marketplace, with the mounted role injected as an extension.
fn role_routes(role: Role) -> Router<AppState> {
    let mut router = Router::new()
        .merge(auth::router())
        .merge(accounts::router())
        .merge(photos::router());
    if role == Role::Mentor {
        router = router
            .merge(accounts::directory_router())
            .merge(ratings::router());
    }
    router.layer(Extension(role))
}

pub fn build_app(state: AppState) -> Router {
    let uploads_dir = state.config.upload_dir.clone();

    Router::new()
        .nest(
            "/api",
            Router::new()
                .nest("/mentors", role_routes(Role::Mentor))
                .nest("/mentees", role_routes(Role::Mentee))
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
