//! Shared fixtures for unit tests: seeded temp databases and a throwaway
//! HTTP server standing in for the price source.

use std::sync::{Arc, Mutex};

use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;
use tempfile::TempDir;
use tokio::net::TcpListener;

use crate::db::CatalogStore;

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
}

/// Fresh schema + reference data in a temp dir. Keep the `TempDir` alive.
pub fn seeded_store() -> (TempDir, CatalogStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = CatalogStore::new(dir.path().join("oranges.sqlite"));
    store.init_schema().unwrap();
    store.seed(false).unwrap();
    (dir, store)
}

/// Serve `body` with `status` at `/prices/fruit`; returns the page URL.
pub async fn serve_page(status: StatusCode, body: String) -> String {
    let app = Router::new().route(
        "/prices/fruit",
        get(move || {
            let body = body.clone();
            async move { (status, [("content-type", "text/html; charset=utf-8")], body) }
        }),
    );
    spawn_source(app).await
}

/// Like [`serve_page`] with a 200, also keeping the last `User-Agent` seen.
pub async fn serve_page_recording_user_agent(body: String) -> (String, Arc<Mutex<Option<String>>>) {
    let seen = Arc::new(Mutex::new(None));
    let recorder = Arc::clone(&seen);
    let app = Router::new().route(
        "/prices/fruit",
        get(move |headers: HeaderMap| {
            let body = body.clone();
            let recorder = Arc::clone(&recorder);
            async move {
                let agent = headers
                    .get(header::USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                *recorder.lock().unwrap() = agent;
                body
            }
        }),
    );
    (spawn_source(app).await, seen)
}

async fn spawn_source(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/prices/fruit", addr)
}

pub async fn serve_status(status: StatusCode) -> String {
    serve_page(status, String::new()).await
}

/// URL on a port nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/prices/fruit", addr)
}
