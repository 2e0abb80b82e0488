//! HTTP front end for the patient records store.
//!
//! Each route extracts form or query fields, makes exactly one repository
//! call and renders a page or a redirect. The uhid is the only key that
//! appears in URLs.

pub mod config;
pub mod error;
pub mod handlers;
pub mod views;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use patient_records_core::Database;

pub use config::WebConfig;
pub use error::AppError;

/// State shared by all handlers. Cloned per request; the pool is shared.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub page_size: u32,
    pub consultants: Arc<str>,
}

impl AppState {
    pub fn new(db: Database, config: &WebConfig) -> Self {
        Self {
            db,
            page_size: config.page_size(),
            consultants: Arc::from(config.consultants()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route("/new", get(handlers::new_form).post(handlers::create))
        .route(
            "/followup",
            get(handlers::follow_up_form).post(handlers::follow_up),
        )
        .route("/patients", get(handlers::list))
        .route(
            "/patients/:uhid/edit",
            get(handlers::edit_form).post(handlers::update),
        )
        .route("/patients/:uhid/delete", post(handlers::delete))
        .with_state(state)
}
