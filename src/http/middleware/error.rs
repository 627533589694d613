//! Panic recovery middleware.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};

use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures_util::FutureExt;

use crate::context::Context;
use crate::dispatch::{Handler, Middleware};
use crate::http::request::RequestIdExt;

/// Turns a panic further in the chain into a 500 response.
///
/// Place it first in the configured order so it wraps every other stage. The
/// panic message and backtrace are logged; in development mode they are also
/// sent to the client.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorMiddleware {
    show_details: bool,
}

impl ErrorMiddleware {
    pub fn new(show_details: bool) -> Self {
        Self { show_details }
    }
}

thread_local! {
    static LAST_BACKTRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Chain a hook that records the backtrace of every panic on its thread.
///
/// The unwind is caught on the thread that panicked, so the recovery code
/// reads it back from the same thread-local.
fn install_backtrace_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(Backtrace::force_capture()));
            previous(info);
        }));
    });
}

fn take_backtrace() -> String {
    LAST_BACKTRACE
        .with(|slot| slot.borrow_mut().take())
        .map(|bt| bt.to_string())
        .unwrap_or_default()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Middleware for ErrorMiddleware {
    fn name(&self) -> String {
        "Error".to_string()
    }

    fn wrap(&self, next: Handler, context: Arc<Context>) -> Handler {
        install_backtrace_hook();
        let show_details = self.show_details;
        Handler::new(move |mut request| {
            let id = request.ensure_request_id();
            let path = request.uri().path().to_string();
            let context = context.clone();
            let next = next.clone();
            let future = async move { next.call(request).await };

            async move {
                match AssertUnwindSafe(future).catch_unwind().await {
                    Ok(response) => response,
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        let backtrace = take_backtrace();
                        tracing::error!(
                            request_id = %id,
                            path = %path,
                            panic = %message,
                            backtrace = %backtrace,
                            "Handler panicked"
                        );
                        context.delete_all(id);

                        let body = if show_details {
                            format!("{message}\n{backtrace}")
                        } else {
                            "Internal Server Error".to_string()
                        };
                        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;

    fn panicking() -> Handler {
        Handler::new(|_req: Request<Body>| async move {
            if true {
                panic!("boom");
            }
            "unreachable"
        })
    }

    async fn body_of(handler: &Handler) -> (StatusCode, String) {
        let res = handler.call(Request::new(Body::empty())).await;
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_panic_becomes_500() {
        let handler = ErrorMiddleware::new(false).wrap(panicking(), Arc::new(Context::new()));
        assert_eq!(
            body_of(&handler).await,
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
        );
    }

    #[tokio::test]
    async fn test_devel_shows_message_and_backtrace() {
        let handler = ErrorMiddleware::new(true).wrap(panicking(), Arc::new(Context::new()));
        let (status, body) = body_of(&handler).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (message, backtrace) = body.split_once('\n').unwrap();
        assert_eq!(message, "boom");
        assert!(!backtrace.trim().is_empty());
    }

    #[tokio::test]
    async fn test_backtrace_is_consumed() {
        let handler = ErrorMiddleware::new(false).wrap(panicking(), Arc::new(Context::new()));
        body_of(&handler).await;
        assert_eq!(take_backtrace(), "");
    }

    #[test]
    fn test_panic_message_kinds() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic");
    }
}
