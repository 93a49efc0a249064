#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Form, Router};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use tokio::net::TcpListener;

type Store = Arc<Mutex<BTreeMap<String, String>>>;

/// In-process stand-in for the database HTTP API.
pub struct Backend {
    pub url: String,
    store: Store,
}

impl Backend {
    pub fn value(&self, key: &str) -> Option<String> {
        self.store.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.store.lock().unwrap().len()
    }
}

pub async fn spawn_backend() -> Backend {
    let store = Store::default();
    let app = Router::new()
        .route("/v0/test-token", get(list))
        .route("/v0/test-token/:key", get(read).post(write).delete(remove))
        .with_state(store.clone());
    let addr = serve(app).await;
    Backend {
        url: format!("{}/v0/test-token", addr),
        store,
    }
}

/// A backend answering every request with the same status and body.
pub async fn spawn_status_backend(status: StatusCode, body: &'static str) -> String {
    let app = Router::new().fallback(move || async move { (status, body) });
    format!("{}/v0/test-token", serve(app).await)
}

/// A backend answering every request with 200 and the given raw bytes.
pub async fn spawn_bytes_backend(body: &'static [u8]) -> String {
    let app = Router::new().fallback(move || async move { (StatusCode::OK, body) });
    format!("{}/v0/test-token", serve(app).await)
}

/// A backend that accepts connections but never answers.
pub async fn spawn_silent_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    format!("http://{}/v0/test-token", addr)
}

/// A URL nothing is listening on.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{}/v0/test-token", addr)
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{}", addr)
}

async fn read(State(store): State<Store>, Path(key): Path<String>) -> Result<String, StatusCode> {
    store
        .lock()
        .unwrap()
        .get(&key)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)
}

async fn write(
    State(store): State<Store>,
    Path(key): Path<String>,
    Form(mut fields): Form<HashMap<String, String>>,
) -> StatusCode {
    // The form field is named after the key itself.
    match fields.remove(&key) {
        Some(value) => {
            store.lock().unwrap().insert(key, value);
            StatusCode::OK
        }
        None => StatusCode::BAD_REQUEST,
    }
}

async fn remove(State(store): State<Store>, Path(key): Path<String>) -> StatusCode {
    store.lock().unwrap().remove(&key);
    StatusCode::NO_CONTENT
}

async fn list(State(store): State<Store>, Query(params): Query<HashMap<String, String>>) -> String {
    let prefix = params.get("prefix").map(String::as_str).unwrap_or_default();
    let encode = params.get("encode").is_some_and(|v| v == "true");
    store
        .lock()
        .unwrap()
        .keys()
        .filter(|k| k.starts_with(prefix))
        .map(|k| {
            if encode {
                utf8_percent_encode(k, NON_ALPHANUMERIC).to_string()
            } else {
                k.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
