mod api;
mod config;
mod db;
mod error;
mod models;
mod registry;
mod schema;
mod services;
mod websocket;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::DbPool;
use crate::registry::ConnectionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub registry: ConnectionRegistry,
}

#[derive(Parser)]
#[command(version, about = "Signage Server - digital signage management backend", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "server-config.toml")]
    config: String,

    /// Generate a default configuration template to stdout
    #[arg(long)]
    generate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.generate_config {
        println!("{}", Config::default_template());
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "signage_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if std::fs::metadata(&cli.config).is_err() {
        eprintln!("Error: Configuration file '{}' not found.", cli.config);
        eprintln!("Run with --generate-config to see a template.");
        std::process::exit(1);
    }

    let config = Config::load(&cli.config)?;
    tracing::info!("Loaded configuration from {}", cli.config);

    // Setup database
    let db_pool = db::create_pool(&config.database.url)?;
    db::run_migrations(&mut db_pool.get()?)?;
    tracing::info!("Database initialized");

    let state = AppState {
        db: db_pool,
        config: Arc::new(config),
        registry: ConnectionRegistry::new(),
    };

    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        // Administrative API
        .nest("/api/v1", api::routes())
        // Screen channel and push endpoints
        .route("/ws/screen/:screen_name", get(websocket::ws_handler))
        .route(
            "/ws/screen/:screen_name/reload",
            post(websocket::reload_screen),
        )
        .route("/ws/broadcast", post(websocket::broadcast_message))
        .route("/ws/connected", get(websocket::connected_screens))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "status": "online",
        "project": "Signage Server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}
