pub mod dto;
pub mod errors;
pub mod handlers;

use axum::{routing::get, Router};
use chrono_tz::Tz;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::store::Store;
use handlers::ApiDoc;

/// Shared, read-only state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Store,
    /// Station calendar for archive windows.
    pub tz: Tz,
    pub towers_enabled: bool,
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/data", get(handlers::get_data))
        .route("/moon", get(handlers::get_moon))
        .route("/archive/{window}", get(handlers::get_archive_window))
        .with_state(state)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
}
