//! Assembles the Axum [`Router`] from all handler modules.

use std::sync::Arc;

use axum::{routing::get, Router};
use riverdata::FormatRegistry;
use tower_http::trace::TraceLayer;

use crate::{
    config::ServerConfig,
    handlers::{formats, locations, offices, ratings, water, AppState},
    storage::Storage,
};

/// Build the complete application router with shared state.
pub fn build_router(
    storage: Arc<dyn Storage>,
    registry: Arc<FormatRegistry>,
    config: ServerConfig,
) -> Router {
    let state = AppState {
        storage,
        registry,
        config,
    };

    Router::new()
        // Offices
        .route("/offices", get(offices::list))
        .route("/offices/{office}", get(offices::get))
        // Locations
        .route("/locations", get(locations::list))
        .route("/locations/{office}/{name}", get(locations::get))
        // Ratings
        .route("/ratings/template", get(ratings::list_templates))
        .route("/ratings/template/{template_id}", get(ratings::get_template))
        // Water supply
        .route(
            "/projects/{office}/{project_id}/water-user/{water_user}",
            get(water::get_water_user),
        )
        // Registry
        .route("/formats", get(formats::catalog))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
