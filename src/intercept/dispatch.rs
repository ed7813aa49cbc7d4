// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Handler chain dispatch
//!
//! Drives one request forward: invoke the next handler, or pass the request
//! through unmodified once the chain is exhausted. Handlers re-enter here
//! through `continue_request()`.

use futures::future::{BoxFuture, FutureExt};

use super::decision::Decision;
use super::request::{InterceptedRequest, Step};
use crate::error::Result;

/// Advance `request` past its current chain position
///
/// The position is claimed synchronously, before the returned future is
/// polled. Handler errors are returned as-is; the request stays pending.
pub(crate) fn advance(request: &InterceptedRequest) -> BoxFuture<'static, Result<()>> {
    let step = request.claim_next();
    let request = request.clone();

    async move {
        match step? {
            Step::Invoke(handler, next) => {
                tracing::debug!(
                    request_id = %next.request_id(),
                    handler = handler.name(),
                    position = next.position(),
                    "Invoking request handler"
                );
                handler.handle(next).await
            }
            Step::Exhausted => {
                request.resolve(Decision::pass_through()).await?;
                request.metrics().record_pass_through();
                Ok(())
            }
        }
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use serde_json::json;

    use crate::error::Error;
    use crate::intercept::{handler_fn, Interceptor, RequestHandler};
    use crate::protocol::{RecordingChannel, RequestPaused};

    fn paused(id: &str) -> RequestPaused {
        RequestPaused::new(id, "GET", "https://example.com/", "Document")
    }

    /// Handler that records its label and continues
    fn passing(log: &Arc<Mutex<Vec<&'static str>>>, label: &'static str) -> impl RequestHandler {
        let log = log.clone();
        handler_fn(move |request| {
            let log = log.clone();
            async move {
                log.lock().push(label);
                request.continue_request().await
            }
        })
    }

    #[tokio::test]
    async fn test_empty_chain_passes_through() {
        let channel = Arc::new(RecordingChannel::new());
        let interceptor = Interceptor::new(channel.clone());

        interceptor.on_request_paused(paused("r1")).await.unwrap();

        let commands = channel.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].method, "Fetch.continueRequest");
        assert_eq!(commands[0].params, json!({"requestId": "r1"}));
        assert_eq!(interceptor.stats().passed_through, 1);
    }

    #[tokio::test]
    async fn test_handlers_run_in_registration_order() {
        let channel = Arc::new(RecordingChannel::new());
        let interceptor = Interceptor::new(channel.clone());
        let log = Arc::new(Mutex::new(Vec::new()));

        interceptor.register(passing(&log, "first"));
        interceptor.register(passing(&log, "second"));
        interceptor.register(passing(&log, "third"));

        interceptor.on_request_paused(paused("r1")).await.unwrap();

        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
        assert_eq!(channel.len(), 1);
        assert_eq!(channel.commands()[0].params, json!({"requestId": "r1"}));
    }

    #[tokio::test]
    async fn test_kth_handler_runs_only_if_all_before_continued() {
        let channel = Arc::new(RecordingChannel::new());
        let interceptor = Interceptor::new(channel.clone());
        let log = Arc::new(Mutex::new(Vec::new()));

        interceptor.register(passing(&log, "first"));
        let stop_log = log.clone();
        interceptor.register(handler_fn(move |request| {
            let log = stop_log.clone();
            async move {
                log.lock().push("blocker");
                request.abort().await
            }
        }));
        interceptor.register(passing(&log, "never"));

        interceptor.on_request_paused(paused("r1")).await.unwrap();

        assert_eq!(*log.lock(), vec!["first", "blocker"]);
        assert_eq!(channel.commands()[0].method, "Fetch.failRequest");
    }

    #[tokio::test]
    async fn test_double_continue_is_stale() {
        let channel = Arc::new(RecordingChannel::new());
        let interceptor = Interceptor::new(channel.clone());
        let log = Arc::new(Mutex::new(Vec::new()));
        let results = Arc::new(Mutex::new(Vec::new()));

        let buggy_results = results.clone();
        interceptor.register(handler_fn(move |request| {
            let results = buggy_results.clone();
            async move {
                let first = request.continue_request().await;
                let second = request.continue_request().await;
                results.lock().push((first.is_ok(), second));
                Ok::<(), Error>(())
            }
        }));
        interceptor.register(passing(&log, "downstream"));

        interceptor.on_request_paused(paused("r1")).await.unwrap();

        assert_eq!(*log.lock(), vec!["downstream"]);
        assert_eq!(channel.len(), 1);

        let results = results.lock();
        assert!(results[0].0);
        // the chain already resolved, so the repeat is a resolution conflict
        assert!(matches!(results[0].1, Err(Error::AlreadyResolved { .. })));
    }

    #[tokio::test]
    async fn test_two_buggy_handlers_send_one_command() {
        let channel = Arc::new(RecordingChannel::new());
        let interceptor = Interceptor::new(channel.clone());
        let invoked = Arc::new(Mutex::new(0usize));
        let stale = Arc::new(Mutex::new(0usize));

        for _ in 0..2 {
            let invoked = invoked.clone();
            let stale = stale.clone();
            interceptor.register(handler_fn(move |request| {
                let invoked = invoked.clone();
                let stale = stale.clone();
                async move {
                    *invoked.lock() += 1;
                    // pass on twice without awaiting the first
                    let first = request.continue_request();
                    let second = request.continue_request();
                    if second.await.is_err() {
                        *stale.lock() += 1;
                    }
                    first.await
                }
            }));
        }

        interceptor.on_request_paused(paused("r1")).await.unwrap();

        assert_eq!(*invoked.lock(), 2);
        assert_eq!(channel.len(), 1);
        assert_eq!(*stale.lock(), 2);
    }

    #[tokio::test]
    async fn test_handler_error_leaves_request_pending() {
        let channel = Arc::new(RecordingChannel::new());
        let interceptor = Interceptor::new(channel.clone());

        interceptor.register(handler_fn(|_request| async move {
            Err::<(), _>(Error::handler("rule engine unavailable"))
        }));

        let err = interceptor.on_request_paused(paused("r1")).await.unwrap_err();

        assert!(matches!(err, Error::Handler(_)));
        assert!(channel.is_empty());
        assert_eq!(interceptor.in_flight(), vec!["r1".to_string()]);
        assert_eq!(interceptor.stats().dispatch_errors, 1);
    }

    #[tokio::test]
    async fn test_handler_may_decide_after_suspending() {
        let channel = Arc::new(RecordingChannel::new());
        let interceptor = Interceptor::new(channel.clone());

        interceptor.register(handler_fn(|request| async move {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            request.fail().await
        }));

        interceptor.on_request_paused(paused("r1")).await.unwrap();
        assert_eq!(channel.commands()[0].method, "Fetch.failRequest");
    }
}
