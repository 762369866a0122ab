mod accounts;
mod app;
mod auth;
mod config;
mod error;
mod mailer;
mod photos;
mod ratings;
mod role;
mod state;
mod storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "mentorconnect=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;

    // Same schema in both role stores.
    for (store, pool) in [
        ("mentor", &app_state.mentor_db),
        ("mentee", &app_state.mentee_db),
    ] {
        if let Err(e) = sqlx::migrate!("./migrations").run(pool).await {
            tracing::warn!(store, error = %e, "migration failed; continuing");
        }
    }

    let app = app::build_app(app_state);
    app::serve(app).await
}
