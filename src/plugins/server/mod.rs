mod auth;
mod courses;
mod learning;
mod media;

use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use axum::{
  Router,
  routing::{get, post},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

use crate::{prelude::*, state::AppState};

pub use auth::Auth;

async fn health() -> &'static str {
  "OK"
}

pub fn router(app: Arc<AppState>) -> Router {
  Router::new()
    .route("/health", get(health))
    // users
    .route("/auth/register", post(auth::register))
    .route("/auth/login", post(auth::login))
    .route("/auth/logout", post(auth::logout))
    // catalog
    .route(
      "/categories",
      get(courses::categories).post(courses::create_category),
    )
    .route("/courses", get(courses::list).post(courses::create))
    .route("/courses/mine", get(courses::mine))
    .route("/courses/teaching", get(courses::teaching))
    .route(
      "/courses/{id}",
      get(courses::detail).patch(courses::update).delete(courses::delete),
    )
    .route(
      "/courses/{id}/modules",
      get(courses::modules).post(courses::create_module),
    )
    .route(
      "/modules/{id}/lessons",
      get(courses::lessons).post(courses::create_lesson),
    )
    .route("/lessons/{id}", get(courses::lesson).delete(courses::delete_lesson))
    .route("/lessons/{id}/reorder", post(courses::reorder_lesson))
    .route(
      "/lessons/{id}/materials",
      get(courses::materials).post(courses::create_material),
    )
    // enrollment and progress
    .route("/courses/{id}/enroll", post(learning::enroll))
    .route("/courses/{id}/check-access", get(learning::check_access))
    .route("/courses/{id}/content", get(learning::content))
    .route("/courses/{id}/progress", get(learning::course_progress))
    .route("/courses/{id}/complete", post(learning::complete_for_student))
    .route("/lessons/{id}/complete", post(learning::complete_lesson))
    .route("/lessons/{id}/mark-incomplete", post(learning::mark_incomplete))
    .route("/lessons/{id}/progress", post(learning::touch))
    .route("/progress", get(learning::summaries))
    .route("/enrollments", get(learning::enrollments))
    .route("/enrollments/{id}", get(learning::enrollment))
    .route("/enrollments/{id}/progress", get(learning::enrollment_progress))
    .route("/enrollments/{id}/confirm-payment", post(learning::confirm_payment))
    .route("/enrollments/{id}/fail-payment", post(learning::fail_payment))
    .route("/enrollments/{id}/refund", post(learning::refund))
    .route("/enrollments/{id}/complete", post(learning::complete_enrollment))
    // media
    .route("/lessons/{id}/video", get(media::video))
    .route("/lessons/{id}/stream", get(media::stream))
    .route("/materials/{id}/download", get(media::download))
    .layer(
      ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
        CorsLayer::new()
          .allow_origin(Any)
          .allow_methods(Any)
          .allow_headers(Any),
      ),
    )
    .with_state(app)
}

pub struct Plugin;

#[async_trait]
impl super::Plugin for Plugin {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let governor_conf = Arc::new(
      GovernorConfigBuilder::default()
        .per_second(app.config.rate_per_second)
        .burst_size(app.config.rate_burst)
        .finish()
        .context("Failed to build rate limiter config")?,
    );

    let limiter = governor_conf.limiter().clone();

    let addr = SocketAddr::from(([0, 0, 0, 0], app.config.port));
    let router = router(app)
      .layer(GovernorLayer::new(governor_conf))
      .into_make_service_with_connect_info::<SocketAddr>();

    let listener = tokio::net::TcpListener::bind(addr)
      .await
      .with_context(|| format!("Failed to bind {addr}"))?;
    info!("HTTP Server listening on {addr}");

    let limiter = async {
      loop {
        tokio::time::sleep(Duration::from_secs(60)).await;
        limiter.retain_recent();
      }
    };

    let server = async {
      axum::serve(listener, router).await.context("Axum server error")
    };

    tokio::select! {
      result = server => {
        match &result {
          Ok(_) => info!("Server stopped gracefully"),
          Err(err) => error!("Server stopped with error: {err}"),
        }
        result
      }
      _ = limiter => {
        error!("Rate limiter cleaner stopped unexpectedly!");
        Ok(())
      }
    }
  }
}
