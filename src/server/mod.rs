// src/server/mod.rs

//! HTTP surface over the index and storage.
//!
//! - `GET /{prefix}`: every indexed record as a tab-indented JSON array
//! - `GET /{prefix}/{name}`: the stored image, if it is indexed

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::index::ImageIndex;
use crate::storage::ImageStorage;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    index: Arc<dyn ImageIndex>,
    storage: Arc<dyn ImageStorage>,
}

impl AppState {
    pub fn new(index: Arc<dyn ImageIndex>, storage: Arc<dyn ImageStorage>) -> Self {
        Self { index, storage }
    }
}

/// Build the router serving the listing and the stored files under
/// `/{url_prefix}`.
pub fn router(url_prefix: &str, state: AppState) -> Router {
    let prefix = url_prefix.trim_matches('/');
    Router::new()
        .route(&format!("/{prefix}"), get(list_images))
        .route(&format!("/{prefix}/{{name}}"), get(serve_image))
        .with_state(state)
}

/// Bind `listen_addr` and serve until `shutdown` is cancelled.
pub async fn serve(
    listen_addr: &str,
    router: Router,
    shutdown: CancellationToken,
) -> Result<()> {
    let listener = TcpListener::bind(listen_addr)
        .await
        .map_err(|e| AppError::server(format!("failed to bind {listen_addr}: {e}")))?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(AppError::server)?;

    log::info!("Server stopped");
    Ok(())
}

async fn list_images(State(state): State<AppState>) -> Response {
    let records = match state.index.find_all().await {
        Ok(records) => records,
        Err(e) => return internal_error(e),
    };
    match to_tab_indented_json(&records) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => internal_error(AppError::Json(e)),
    }
}

async fn serve_image(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    // Only indexed objects are exposed.
    match state.index.get(&name).await {
        Ok(Some(_)) => {}
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => return internal_error(e),
    }

    match state.storage.read(&name).await {
        Ok(Some(bytes)) => ([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response(),
        Ok(None) => {
            log::warn!("{} is indexed but missing from storage", name);
            StatusCode::NOT_FOUND.into_response()
        }
        Err(e) => internal_error(e),
    }
}

fn internal_error(error: AppError) -> Response {
    log::error!("Request failed: {}", error);
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

/// Pretty-print with tab indentation.
fn to_tab_indented_json<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}
