//! Endpoints of HTTP server.
//!
use std::{sync::Arc, time::Instant};

use anyhow::Context;
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequest, Multipart},
    http::{header, Method, Request, StatusCode},
    response::{Html, IntoResponse, Response},
    Extension,
};

use crate::{form::ImageUploadForm, render, AppState};

/// What a request to the predict page asks for.
#[derive(Debug)]
pub enum PageRequest {
    /// Show the blank upload form.
    View,
    /// Classify the submitted form.
    Submit(ImageUploadForm),
}

#[async_trait]
impl<S> FromRequest<S, Body> for PageRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let method = req.method().clone();

        if method == Method::GET || method == Method::HEAD {
            Ok(PageRequest::View)
        } else if method == Method::POST {
            // A body which is not multipart counts as a submission without an image
            let form = match Multipart::from_request(req, state).await {
                Ok(multipart) => ImageUploadForm::from_multipart(multipart).await,
                Err(rejection) => {
                    log::debug!("Treating POST as empty form: {}", rejection);
                    ImageUploadForm::empty()
                }
            };
            Ok(PageRequest::Submit(form))
        } else {
            log::debug!("Rejecting {} request", method);
            Err((
                StatusCode::METHOD_NOT_ALLOWED,
                [(header::ALLOW, "GET, POST")],
            )
                .into_response())
        }
    }
}

/// Failure while classifying a valid upload.
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        log::error!("Request failed: {:#}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// Health check endpoint.
pub async fn healthcheck() -> &'static str {
    "healthy"
}

/// Upload page: blank form on GET, predictions for a valid image on POST.
pub async fn predict(
    Extension(state): Extension<AppState>,
    page: PageRequest,
) -> Result<Html<String>, AppError> {
    let form = match page {
        PageRequest::View => return Ok(Html(render::blank_page())),
        PageRequest::Submit(form) => form,
    };

    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(e) => {
            log::debug!("Upload rejected: {}", e);
            return Ok(Html(render::blank_page()));
        }
    };

    let img_data = valid.display_url();
    let classifier = Arc::clone(&state.classifier);
    let start = Instant::now();
    let predictions = tokio::task::spawn_blocking(move || classifier.classify(&valid.image))
        .await
        .context("inference task failed")??;

    match predictions.first() {
        Some(top) => log::info!(
            "Classified upload as {} ({:.2}%) in {:.2?}",
            top.label,
            top.confidence * 100.0,
            start.elapsed()
        ),
        None => log::warn!("Classifier returned no predictions"),
    }

    Ok(Html(render::result_page(&predictions, &img_data)))
}
