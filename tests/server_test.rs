//! End-to-end tests against a real listener.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use common::{spawn_server, text};
use dispatchkit::http::X_REQUEST_ID;
use dispatchkit::{Handler, Method, Route, ScopeExt, Server, WebConfig};

fn server() -> Server {
    let mut server = Server::new(WebConfig::default());

    let root = server.dispatcher("/").unwrap();
    root.handle(Route::new(
        "/hello/:name",
        Method::GET,
        Handler::new(|req: Request<Body>| async move {
            let name = req.scope().and_then(|s| s.param("name")).unwrap_or_default();
            format!("Hello {name}")
        }),
    ))
    .unwrap();
    root.handle(Route::new(
        "/old",
        Method::GET,
        Handler::new(|req: Request<Body>| async move {
            if let Some(scope) = req.scope() {
                scope.forward("/hello/forwarded");
            }
        }),
    ))
    .unwrap();

    let api = server.dispatcher("/api/").unwrap();
    api.handle(Route::new("/status", Method::GET, text("ok"))).unwrap();

    server
}

#[tokio::test]
async fn test_serves_mounted_dispatchers() {
    let (addr, shutdown, handle) = spawn_server(server()).await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let res = client.get(format!("{base}/hello/World")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key(X_REQUEST_ID));
    assert_eq!(res.text().await.unwrap(), "Hello World");

    let res = client.get(format!("{base}/old")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "Hello forwarded");

    let res = client.get(format!("{base}/api/status")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "ok");

    let res = client.get(format!("{base}/api/missing")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.text().await.unwrap(), "Not Found");

    let res = client.post(format!("{base}/hello/World")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    shutdown.trigger();
    let stopped = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(matches!(stopped, Ok(Ok(Ok(())))));
}

#[tokio::test]
async fn test_request_ids_are_unique() {
    let (addr, shutdown, _handle) = spawn_server(server()).await;
    let client = reqwest::Client::new();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let res = client.get(format!("http://{addr}/hello/x")).send().await.unwrap();
        ids.push(res.headers()[X_REQUEST_ID].to_str().unwrap().to_string());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);

    shutdown.trigger();
}
