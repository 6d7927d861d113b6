//! Fixtures shared by the async tests: a local image host and JPEG samples.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use tokio::net::TcpListener;

/// Encode a synthetic gradient as JPEG.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 90)
        .encode_image(&img)
        .unwrap();
    buf
}

/// A local HTTP server standing in for the manifest endpoint and image host.
pub struct ImageHost {
    pub base: String,
}

impl ImageHost {
    /// Serve `files` under `/images/{file}` and list them in `/images.json`.
    ///
    /// `extra_urls` are appended to the manifest verbatim.
    pub async fn start(files: Vec<(&str, Vec<u8>)>, extra_urls: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let mut urls: Vec<String> = files
            .iter()
            .map(|(file, _)| format!("{base}/images/{file}"))
            .collect();
        urls.extend(extra_urls);
        let manifest = serde_json::json!({
            "Images": urls.iter().map(|u| serde_json::json!({ "Url": u })).collect::<Vec<_>>()
        })
        .to_string();

        let files: HashMap<String, Vec<u8>> = files
            .into_iter()
            .map(|(file, bytes)| (file.to_string(), bytes))
            .collect();

        let router = Router::new()
            .route(
                "/images.json",
                get(move || {
                    let manifest = manifest.clone();
                    async move { ([(header::CONTENT_TYPE, "application/json")], manifest) }
                }),
            )
            .route("/broken.json", get(|| async { "{\"Images\": [" }))
            .route("/images/{file}", get(serve_file))
            .with_state(Arc::new(files));

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { base }
    }

    pub fn manifest_url(&self) -> String {
        format!("{}/images.json", self.base)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }
}

async fn serve_file(
    State(files): State<Arc<HashMap<String, Vec<u8>>>>,
    Path(file): Path<String>,
) -> Response {
    match files.get(&file) {
        Some(bytes) => ([(header::CONTENT_TYPE, "image/jpeg")], bytes.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
