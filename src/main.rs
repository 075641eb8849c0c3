use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use ev_charge::config::AppConfig;
use ev_charge::db::{self, SqliteStore, Store};
use ev_charge::handlers;
use ev_charge::models::Role;
use ev_charge::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    if config.uses_dev_secret() {
        tracing::warn!("SECRET_KEY not set, using the development key");
    }

    let conn = db::init_db(&config.database_url)?;
    let store = SqliteStore::new(conn);

    if let Some(email) = &config.admin_email {
        if store.set_user_role(email, Role::Admin)? {
            tracing::info!(email = %email, "promoted to admin");
        } else {
            tracing::info!(email = %email, "admin account will be created at signup");
        }
    }

    let state = Arc::new(AppState {
        store,
        config: config.clone(),
    });

    let app = handlers::router(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
