//! Web front-end which classifies uploaded photos with a pretrained VGG16 network.

pub mod config;
pub mod endpoints;
pub mod form;
pub mod nn;
pub mod render;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get},
    Extension, Router,
};

use crate::{
    endpoints::{healthcheck, predict},
    nn::Classifier,
};

/// Path of the upload page, the `predict` route.
pub const PREDICT_PATH: &str = "/";

/// State shared by all requests. Built once at startup and never mutated.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<dyn Classifier>,
}

impl AppState {
    pub fn new(classifier: impl Classifier + 'static) -> Self {
        Self {
            classifier: Arc::new(classifier),
        }
    }
}

/// Build the HTTP server with its endpoints.
pub fn build_app(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(PREDICT_PATH, any(predict))
        .route("/healthcheck", get(healthcheck))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(Extension(state))
}
