use std::sync::Arc;

use restaurant_auth::app::{AppState, build_router};
use restaurant_auth::config::{Config, is_lambda};
use restaurant_auth::db::CredentialStore;
use restaurant_auth::db::connection::create_pool;
use restaurant_auth::db::memory::InMemoryCredentialStore;
use restaurant_auth::db::repositories::user_repository::UserRepository;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Si RUST_LOG n'est pas défini, utiliser ces règles par défaut
        tracing_subscriber::EnvFilter::new(
            "info,restaurant_auth=debug,hyper_util=warn,tower_http=info",
        )
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Postgres quand `DATABASE_URL` est défini, sinon stockage en mémoire (dev)
fn credential_store(config: &Config) -> anyhow::Result<Arc<dyn CredentialStore>> {
    match &config.database_url {
        Some(url) => {
            let pool = create_pool(url, config.db_pool_size)?;
            Ok(Arc::new(UserRepository::new(pool)))
        }
        None => Ok(Arc::new(InMemoryCredentialStore::new())),
    }
}

// ----------------- Main -----------------

#[tokio::main]
async fn main() -> Result<(), lambda_http::Error> {
    // Initialize logging for all environments
    setup_logging();
    tracing::info!("Starting restaurant-auth...");

    let config = Config::from_env()?;
    let state = AppState::new(&config, credential_store(&config)?)?;
    let app = build_router(state);

    if is_lambda() {
        tracing::info!("Running in Lambda mode");
        lambda_http::run(app).await
    } else {
        tracing::info!("Running in local HTTP server mode");
        let addr = format!("{}:{}", config.server_host, config.server_port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("🚀 Server running at http://{}", addr);
        axum::serve(listener, app).await?;

        Ok(())
    }
}
