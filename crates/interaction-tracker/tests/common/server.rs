//! A throwaway HTTP collector on a loopback port.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;

#[derive(Clone, Default)]
pub struct Received {
    pub bodies: Arc<Mutex<Vec<Value>>>,
    pub content_types: Arc<Mutex<Vec<String>>>,
    status: Arc<AtomicU16>,
}

impl Received {
    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().unwrap().clone()
    }

    pub fn content_types(&self) -> Vec<String> {
        self.content_types.lock().unwrap().clone()
    }
}

async fn collect(
    State(received): State<Received>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    received.content_types.lock().unwrap().push(content_type);
    received.bodies.lock().unwrap().push(body);

    StatusCode::from_u16(received.status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Serve `POST /events`, answering with 200 until told otherwise.
pub async fn spawn_collector() -> (String, Received) {
    let received = Received::default();
    received.set_status(200);

    let app = Router::new()
        .route("/events", post(collect))
        .with_state(received.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/events", addr), received)
}
