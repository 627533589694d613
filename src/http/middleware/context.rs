//! Context cleanup middleware.

use std::sync::Arc;

use crate::context::Context;
use crate::dispatch::{Handler, Middleware};
use crate::http::request::{RequestId, RequestIdExt};

/// Deletes the request's context bag once the inner chain has finished.
///
/// The bag is also deleted when the inner future panics or is dropped early.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextMiddleware;

struct DeleteOnDrop {
    context: Arc<Context>,
    id: RequestId,
}

impl Drop for DeleteOnDrop {
    fn drop(&mut self) {
        self.context.delete_all(self.id);
    }
}

impl Middleware for ContextMiddleware {
    fn name(&self) -> String {
        "Context".to_string()
    }

    fn wrap(&self, next: Handler, context: Arc<Context>) -> Handler {
        Handler::new(move |mut request| {
            let guard = DeleteOnDrop {
                context: context.clone(),
                id: request.ensure_request_id(),
            };
            let future = next.call(request);
            async move {
                let response = future.await;
                drop(guard);
                response
            }
        })
    }
}
