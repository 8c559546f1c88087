//! Academy - course enrollment, access control and progress tracking
//!
//! Architecture:
//! - SeaORM for database access (SQLite)
//! - Axum for HTTP API with rate limiting
//! - Tokio for async runtime

mod config;
mod entity;
mod error;
mod plugins;
mod prelude;
mod state;
mod sv;
mod utils;

use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{config::Config, plugins::server, prelude::*, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "academy=debug,tower_http=debug,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = Config::from_env()?;

  info!("Starting Academy v{}", env!("CARGO_PKG_VERSION"));

  let app = Arc::new(AppState::with_config(config).await?);

  plugins::App::new().register(server::Plugin).run(app).await;

  tokio::signal::ctrl_c().await.context("Failed to listen for shutdown")?;
  info!("Shutting down");

  Ok(())
}
