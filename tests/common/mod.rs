//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use dispatchkit::{Dispatcher, Handler, Server, Shutdown};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceExt;

/// Handler answering a fixed body.
pub fn text(body: &'static str) -> Handler {
    Handler::new(move |_req| async move { body })
}

/// Send one request through a dispatcher and collect status and body.
pub async fn send(dispatcher: &Dispatcher, method: &str, uri: &str, body: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = dispatcher.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub async fn get(dispatcher: &Dispatcher, uri: &str) -> (StatusCode, String) {
    send(dispatcher, "GET", uri, "").await
}

/// Start a server on an ephemeral local port.
pub async fn spawn_server(server: Server) -> (SocketAddr, Shutdown, JoinHandle<Result<(), std::io::Error>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.clone()));
    (addr, shutdown, handle)
}
