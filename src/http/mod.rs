//! HTTP transport for the pin API.
//!
//! Requires the `http` feature. Uses axum for routing.
//!
//! ## Routes
//!
//! - `GET /health`: liveness message.
//! - `GET /toilets`: every pin; 404 when there are none.
//! - `POST /toilets`: create one pin.
//! - `POST /toilets/batch`: create several pins, per-item outcome.
//! - `GET /toilets/nearby?swLong&swLat&neLong&neLat`: viewport query; 404 when empty.
//! - `GET /toilets/near?long&lat&radius`: radius query in metres; 404 when empty.
//! - `GET|PATCH|DELETE /toilets/:id`
//!
//! Errors are `{ "message": ... }` bodies.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use privy_pin::{http, InMemorySpatialStore, PinRepository};
//!
//! let repo = Arc::new(PinRepository::new(InMemorySpatialStore::new()));
//!
//! // Compose with other axum routes
//! let api = http::router(repo.clone());
//!
//! // Or serve directly, mounted under /api with tracing and CORS
//! http::serve(repo, "0.0.0.0:3001", std::future::pending()).await?;
//! ```

mod error;
mod toilets;

use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::query::ViewportQueryService;
use crate::repository::PinRepository;
use crate::store::SpatialStore;

pub use error::ApiError;

pub(crate) struct AppState<S> {
    repo: Arc<PinRepository<S>>,
    query: ViewportQueryService<S>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            query: self.query.clone(),
        }
    }
}

/// Build the API `Router` (unprefixed, no middleware).
pub fn router<S: SpatialStore + 'static>(repo: Arc<PinRepository<S>>) -> Router {
    let state = AppState {
        query: ViewportQueryService::new(Arc::clone(&repo)),
        repo,
    };

    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/toilets",
            get(toilets::list::<S>).post(toilets::create::<S>),
        )
        .route("/toilets/batch", post(toilets::create_batch::<S>))
        .route("/toilets/nearby", get(toilets::nearby::<S>))
        .route("/toilets/near", get(toilets::near::<S>))
        .route(
            "/toilets/:id",
            get(toilets::get_one::<S>)
                .patch(toilets::update::<S>)
                .delete(toilets::remove::<S>),
        )
        .with_state(state)
}

/// The full application: `router` mounted under `/api` with request tracing and CORS.
pub fn app<S: SpatialStore + 'static>(repo: Arc<PinRepository<S>>) -> Router {
    Router::new()
        .nest("/api", router(repo))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve `app` at the given address until `shutdown` resolves.
pub async fn serve<S: SpatialStore + 'static>(
    repo: Arc<PinRepository<S>>,
    addr: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "pin API listening");
    axum::serve(listener, app(repo))
        .with_graceful_shutdown(shutdown)
        .await
}

/// `GET /health`
async fn health_handler() -> Json<Value> {
    Json(json!({ "message": "Privy Pin API is running" }))
}
