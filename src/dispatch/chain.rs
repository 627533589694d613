//! Middleware chain construction.
//!
//! Ordering is a pure function of two name lists: the order declared in the
//! configuration and the order in which middleware was registered. Wrapping
//! then turns the ordered stages into a single handler.

use std::collections::HashSet;
use std::sync::Arc;

use crate::context::Context;
use crate::dispatch::handler::{Handler, Middleware};

/// Merge the declared middleware order with the registration order.
///
/// Declared names keep their configured order, duplicates dropped. Registered
/// names that were not declared are prepended, so they end up in front of the
/// declared ones in registration order.
pub fn merge_middleware_order(declared: &[String], registered: &[String]) -> Vec<String> {
    let mut placed: HashSet<&str> = HashSet::new();
    let mut order = Vec::with_capacity(declared.len() + registered.len());
    for name in declared {
        if placed.insert(name) {
            order.push(name.clone());
        }
    }

    let mut unplaced = Vec::new();
    for name in registered {
        if placed.insert(name) {
            unplaced.push(name.clone());
        }
    }

    for name in unplaced.into_iter().rev() {
        order.insert(0, name);
    }
    order
}

/// Wrap `terminal` so that `stages[0]` is the outermost stage.
pub fn wrap_chain(terminal: Handler, stages: &[Arc<dyn Middleware>], context: &Arc<Context>) -> Handler {
    stages
        .iter()
        .rev()
        .fold(terminal, |next, stage| stage.wrap(next, context.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::response::IntoResponse;
    use std::sync::Mutex;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_prepends_unplaced() {
        let order = merge_middleware_order(
            &names(&["Static", "MyCustom", "Error"]),
            &names(&["MyCustom", "MyCustom2"]),
        );
        assert_eq!(order, names(&["MyCustom2", "Static", "MyCustom", "Error"]));
    }

    #[test]
    fn test_merge_keeps_registration_order_of_unplaced() {
        let order = merge_middleware_order(&names(&["Error"]), &names(&["A", "B", "C"]));
        assert_eq!(order, names(&["A", "B", "C", "Error"]));
    }

    #[test]
    fn test_merge_dedups() {
        let order = merge_middleware_order(&names(&["Error", "Error", "Context"]), &names(&["Context", "X", "X"]));
        assert_eq!(order, names(&["X", "Error", "Context"]));
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_middleware_order(&[], &[]).is_empty());
    }

    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Recorder {
        fn name(&self) -> String {
            self.label.to_string()
        }

        fn wrap(&self, next: Handler, _context: Arc<Context>) -> Handler {
            let label = self.label;
            let log = self.log.clone();
            Handler::new(move |req| {
                let next = next.clone();
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(format!("{label}>"));
                    let res = next.call(req).await;
                    log.lock().unwrap().push(format!("<{label}"));
                    res
                }
            })
        }
    }

    #[tokio::test]
    async fn test_first_stage_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stages: Vec<Arc<dyn Middleware>> = ["A", "B", "C"]
            .into_iter()
            .map(|label| {
                Arc::new(Recorder {
                    label,
                    log: log.clone(),
                }) as Arc<dyn Middleware>
            })
            .collect();

        let terminal_log = log.clone();
        let terminal = Handler::new(move |_req| {
            let log = terminal_log.clone();
            async move {
                log.lock().unwrap().push("handler".to_string());
                "done".into_response()
            }
        });

        let chain = wrap_chain(terminal, &stages, &Arc::new(Context::new()));
        let res = chain.call(Request::new(Body::empty())).await;
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"done");

        assert_eq!(
            *log.lock().unwrap(),
            vec!["A>", "B>", "C>", "handler", "<C", "<B", "<A"]
        );
    }
}
