use anyhow::{Context, Result};
use axum::{extract::FromRef, Router};
use reqwest::Client;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, fmt};

use crate::cache::QueryCache;
use crate::config::Settings;
use crate::market_api::MarketApi;

// Declare modules
mod cache;
mod config;
mod error;
mod favorites;
mod filters;
mod market_api;
mod models;
mod routes;
mod session;

// Shared application state. The query cache lives here, one instance for the
// whole process; handlers reach it through the State extractor rather than an
// ambient static.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub api: Arc<MarketApi>,
    pub cache: Arc<QueryCache>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file first. Ignore errors (e.g., file not found)
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carstand_rust=info,tower_http=info".into()),
        )
        .with(fmt::layer())
        .init();

    tracing::info!("Initializing CarStand browsing client...");

    // Load configuration
    let settings = match Settings::new() {
        Ok(s) => {
            tracing::info!("Configuration loaded; marketplace API at {}", s.api_base_url);
            s
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };
    let shared_settings = Arc::new(settings);

    // One reqwest client shared by every handler
    let http_client = Arc::new(
        Client::builder()
            .build()
            .context("Failed to build shared reqwest client")?,
    );
    let api = Arc::new(MarketApi::new(
        http_client,
        shared_settings.api_base_url.clone(),
    ));

    let app_state = AppState {
        settings: shared_settings.clone(),
        api,
        cache: Arc::new(QueryCache::default()),
    };

    let router: Router = routes::create_router(app_state);

    // Combine the router with static file serving
    let app = router.nest_service("/static", ServeDir::new("static"));

    let addr: SocketAddr = shared_settings
        .server_address
        .parse()
        .with_context(|| {
            format!(
                "Invalid server address in configuration: '{}'",
                shared_settings.server_address
            )
        })?;

    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => {
            tracing::info!("Server listening on {}", addr);
            l
        }
        Err(e) => {
            tracing::error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
