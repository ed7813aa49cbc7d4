// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Intercepted request: inspection accessors and one-shot decisions

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;

use super::decision::{ContinueOverrides, Decision, DecisionKind, FulfillResponse};
use super::dispatch;
use super::handler::RequestHandler;
use super::interceptor::Shared;
use super::stats::InterceptMetrics;
use crate::error::{Error, Result};
use crate::protocol::{RequestPaused, ResourceType};

/// Handlers registered at the time a request was paused, in order
pub(crate) type HandlerChain = Arc<[Arc<dyn RequestHandler>]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Pending,
    Resolved(DecisionKind),
}

struct ChainState {
    /// Number of chain positions already claimed
    cursor: usize,
    resolution: Resolution,
}

/// Outcome of claiming the next chain position
pub(crate) enum Step {
    Invoke(Arc<dyn RequestHandler>, InterceptedRequest),
    Exhausted,
}

struct EventInner {
    paused: RequestPaused,
    chain: HandlerChain,
    state: Mutex<ChainState>,
    shared: Arc<Shared>,
}

/// A paused request awaiting exactly one terminal decision
///
/// Handles are cheap to clone. Each handler receives a handle bound to its
/// own chain position; only that position may pass the request on with
/// [`continue_request`](Self::continue_request).
#[derive(Clone)]
pub struct InterceptedRequest {
    inner: Arc<EventInner>,
    position: usize,
}

impl InterceptedRequest {
    pub(crate) fn new(paused: RequestPaused, chain: HandlerChain, shared: Arc<Shared>) -> Self {
        Self {
            inner: Arc::new(EventInner {
                paused,
                chain,
                state: Mutex::new(ChainState {
                    cursor: 0,
                    resolution: Resolution::Pending,
                }),
                shared,
            }),
            position: 0,
        }
    }

    /// Protocol request id
    pub fn request_id(&self) -> &str {
        &self.inner.paused.request_id
    }

    /// Request URL
    pub fn url(&self) -> &str {
        &self.inner.paused.request.url
    }

    /// HTTP method
    pub fn method(&self) -> &str {
        &self.inner.paused.request.method
    }

    /// Request headers as received
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.inner.paused.request.headers
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers()
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Resource classification string as supplied by the browser
    pub fn resource_type(&self) -> &str {
        &self.inner.paused.resource_type
    }

    /// Parsed resource classification
    pub fn resource_kind(&self) -> ResourceType {
        ResourceType::from_protocol(self.resource_type())
    }

    /// Request body, if the browser included it
    pub fn post_data(&self) -> Option<&str> {
        self.inner.paused.request.post_data.as_deref()
    }

    /// Frame that issued the request
    pub fn frame_id(&self) -> Option<&str> {
        self.inner.paused.frame_id.as_deref()
    }

    /// Host part of the URL
    pub fn host(&self) -> Option<String> {
        url::Url::parse(self.url())
            .ok()
            .and_then(|u| u.host_str().map(String::from))
    }

    /// Chain position this handle is bound to (0 for the host's handle)
    pub fn position(&self) -> usize {
        self.position
    }

    /// Check if a terminal decision has been issued
    pub fn is_resolved(&self) -> bool {
        self.resolution().is_some()
    }

    /// The decision that resolved this request, if any
    pub fn resolution(&self) -> Option<DecisionKind> {
        match self.inner.state.lock().resolution {
            Resolution::Pending => None,
            Resolution::Resolved(kind) => Some(kind),
        }
    }

    /// Fail the request
    pub async fn abort(&self) -> Result<()> {
        self.resolve(Decision::Abort).await
    }

    /// Fail the request; sends the same command as [`abort`](Self::abort)
    pub async fn fail(&self) -> Result<()> {
        self.resolve(Decision::Fail).await
    }

    /// Let the next handler decide, or pass the request through unmodified
    /// when no handler remains
    ///
    /// The chain position is claimed when this is called, not when the
    /// returned future is first polled.
    pub fn continue_request(&self) -> BoxFuture<'static, Result<()>> {
        dispatch::advance(self)
    }

    /// Let the request proceed to the network with optional overrides,
    /// without consulting remaining handlers
    pub async fn defer_to_browser(&self, overrides: ContinueOverrides) -> Result<()> {
        self.resolve(Decision::Continue(overrides)).await
    }

    /// Answer the request with a synthetic response
    pub async fn fulfill(&self, response: FulfillResponse) -> Result<()> {
        self.resolve(Decision::Fulfill(response)).await
    }

    /// Issue any terminal decision
    pub async fn resolve(&self, decision: Decision) -> Result<()> {
        let kind = decision.kind();
        let current = self.inner.state.lock().resolution;
        if let Resolution::Resolved(resolved_by) = current {
            return Err(self.conflict(kind, resolved_by));
        }

        let command = decision.into_command(self.request_id(), &self.inner.shared.config)?;
        let params = command.params()?;

        self.transition(kind)?;

        if self.inner.shared.config.log_decisions {
            tracing::info!(
                request_id = %self.request_id(),
                url = %self.url(),
                decision = %kind,
                "Resolving intercepted request"
            );
        } else {
            tracing::debug!(request_id = %self.request_id(), decision = %kind, "Resolving intercepted request");
        }

        let result = self
            .inner
            .shared
            .channel
            .send_command(command.method(), params)
            .await;
        self.inner.shared.retire(self.request_id());

        match result {
            Ok(_) => {
                self.metrics().record_decision(kind);
                Ok(())
            }
            Err(e) => {
                self.metrics().record_transport_error();
                tracing::warn!(
                    request_id = %self.request_id(),
                    method = command.method(),
                    error = %e,
                    "Command rejected"
                );
                Err(e)
            }
        }
    }

    /// The single Pending -> Resolved transition every decision goes through
    fn transition(&self, kind: DecisionKind) -> Result<()> {
        let mut state = self.inner.state.lock();
        let current = state.resolution;
        match current {
            Resolution::Resolved(resolved_by) => {
                drop(state);
                Err(self.conflict(kind, resolved_by))
            }
            Resolution::Pending => {
                state.resolution = Resolution::Resolved(kind);
                Ok(())
            }
        }
    }

    /// Claim the next handler in the chain for this handle's position
    pub(crate) fn claim_next(&self) -> Result<Step> {
        self.check_turn(&self.inner.state.lock())?;

        // handler filters run unlocked so they may use any accessor
        let chain = &self.inner.chain;
        let found = chain[self.position..]
            .iter()
            .position(|handler| handler.matches(self))
            .map(|offset| self.position + offset);

        let mut state = self.inner.state.lock();
        self.check_turn(&state)?;

        match found {
            Some(index) => {
                state.cursor = index + 1;
                let next = InterceptedRequest {
                    inner: self.inner.clone(),
                    position: state.cursor,
                };
                Ok(Step::Invoke(chain[index].clone(), next))
            }
            None => {
                // past the end, so a repeated continue from the last position is stale
                state.cursor = chain.len() + 1;
                Ok(Step::Exhausted)
            }
        }
    }

    fn check_turn(&self, state: &ChainState) -> Result<()> {
        if let Resolution::Resolved(resolved_by) = state.resolution {
            return Err(self.conflict(DecisionKind::Continue, resolved_by));
        }

        if state.cursor != self.position {
            self.metrics().record_conflict();
            tracing::warn!(
                request_id = %self.request_id(),
                position = self.position,
                "Stale continue ignored"
            );
            return Err(Error::StaleContinuation {
                request_id: self.request_id().to_string(),
                position: self.position,
            });
        }

        Ok(())
    }

    pub(crate) fn metrics(&self) -> &InterceptMetrics {
        &self.inner.shared.metrics
    }

    fn conflict(&self, attempted: DecisionKind, resolved_by: DecisionKind) -> Error {
        self.metrics().record_conflict();
        tracing::warn!(
            request_id = %self.request_id(),
            attempted = %attempted,
            resolved_by = %resolved_by,
            "Decision on resolved request"
        );
        Error::AlreadyResolved {
            request_id: self.request_id().to_string(),
            attempted,
            resolved_by,
        }
    }
}

impl fmt::Debug for InterceptedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptedRequest")
            .field("request_id", &self.request_id())
            .field("method", &self.method())
            .field("url", &self.url())
            .field("resource_type", &self.resource_type())
            .field("position", &self.position)
            .field("resolution", &self.resolution())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intercept::Interceptor;
    use crate::protocol::RecordingChannel;
    use serde_json::json;

    fn setup() -> (Arc<RecordingChannel>, Interceptor) {
        let channel = Arc::new(RecordingChannel::new());
        let interceptor = Interceptor::new(channel.clone());
        (channel, interceptor)
    }

    fn paused(id: &str) -> RequestPaused {
        RequestPaused::new(id, "GET", "https://example.com/api/items?page=2", "XHR")
            .header("Accept", "application/json")
    }

    #[test]
    fn test_accessors() {
        let (_, interceptor) = setup();
        let request = interceptor.intercept(paused("r1")).unwrap();

        assert_eq!(request.request_id(), "r1");
        assert_eq!(request.method(), "GET");
        assert_eq!(request.url(), "https://example.com/api/items?page=2");
        assert_eq!(request.header("accept"), Some("application/json"));
        assert_eq!(request.resource_type(), "XHR");
        assert_eq!(request.resource_kind(), ResourceType::Xhr);
        assert_eq!(request.host().as_deref(), Some("example.com"));
        assert_eq!(request.position(), 0);
        assert!(!request.is_resolved());
    }

    #[tokio::test]
    async fn test_fulfill_404() {
        let (channel, interceptor) = setup();
        let request = interceptor.intercept(paused("r1")).unwrap();

        request
            .fulfill(FulfillResponse::new().status(404).body("hello"))
            .await
            .unwrap();

        let commands = channel.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].method, "Fetch.fulfillRequest");
        assert_eq!(
            commands[0].params,
            json!({
                "requestId": "r1",
                "responseCode": 404,
                "responseHeaders": [{"name": "content-length", "value": "5"}],
                "body": "aGVsbG8="
            })
        );
        assert_eq!(request.resolution(), Some(DecisionKind::Fulfill));
    }

    #[tokio::test]
    async fn test_fulfill_keeps_explicit_length() {
        let (channel, interceptor) = setup();
        let request = interceptor.intercept(paused("r1")).unwrap();

        request
            .fulfill(FulfillResponse::new().header("Content-Length", "99").body("hi"))
            .await
            .unwrap();

        let params = &channel.commands()[0].params;
        assert_eq!(params["responseCode"], 200);
        assert_eq!(
            params["responseHeaders"],
            json!([{"name": "content-length", "value": "99"}])
        );
    }

    #[tokio::test]
    async fn test_defer_to_browser_method_only() {
        let (channel, interceptor) = setup();
        let request = interceptor.intercept(paused("r1")).unwrap();

        request
            .defer_to_browser(ContinueOverrides::new().method("POST"))
            .await
            .unwrap();

        let commands = channel.commands();
        assert_eq!(commands[0].method, "Fetch.continueRequest");
        assert_eq!(commands[0].params, json!({"requestId": "r1", "method": "POST"}));
    }

    #[tokio::test]
    async fn test_abort_and_fail_emit_same_command() {
        let (channel, interceptor) = setup();

        interceptor.intercept(paused("a")).unwrap().abort().await.unwrap();
        interceptor.intercept(paused("b")).unwrap().fail().await.unwrap();

        let commands = channel.commands();
        assert_eq!(commands[0].method, commands[1].method);
        assert_eq!(commands[0].params["errorReason"], "Failed");
        assert_eq!(commands[0].params["errorReason"], commands[1].params["errorReason"]);
    }

    #[tokio::test]
    async fn test_second_decision_conflicts() {
        let (channel, interceptor) = setup();
        let request = interceptor.intercept(paused("r1")).unwrap();

        request.abort().await.unwrap();

        let err = request
            .fulfill(FulfillResponse::new().body("late"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::AlreadyResolved {
                attempted: DecisionKind::Fulfill,
                resolved_by: DecisionKind::Abort,
                ..
            }
        ));
        assert!(request.fail().await.unwrap_err().is_conflict());
        assert!(request.continue_request().await.unwrap_err().is_conflict());
        assert!(request
            .defer_to_browser(ContinueOverrides::new())
            .await
            .unwrap_err()
            .is_conflict());

        assert_eq!(channel.len(), 1);
        assert_eq!(interceptor.stats().conflicts, 4);
        // accessors stay readable after resolution
        assert_eq!(request.url(), "https://example.com/api/items?page=2");
    }

    #[tokio::test]
    async fn test_invalid_override_after_resolution_conflicts() {
        let (channel, interceptor) = setup();
        let request = interceptor.intercept(paused("r1")).unwrap();

        request.abort().await.unwrap();

        let err = request
            .defer_to_browser(ContinueOverrides::new().url("::bad"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::AlreadyResolved {
                attempted: DecisionKind::Continue,
                resolved_by: DecisionKind::Abort,
                ..
            }
        ));
        assert_eq!(channel.len(), 1);
        assert_eq!(interceptor.stats().conflicts, 1);
    }

    #[tokio::test]
    async fn test_invalid_override_leaves_pending() {
        let (channel, interceptor) = setup();
        let request = interceptor.intercept(paused("r1")).unwrap();

        let err = request
            .defer_to_browser(ContinueOverrides::new().url("::not-a-url"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOverride { field: "url", .. }));
        assert!(!request.is_resolved());
        assert!(channel.is_empty());

        request
            .defer_to_browser(ContinueOverrides::new().url("https://example.com/other"))
            .await
            .unwrap();
        assert_eq!(channel.commands()[0].params["url"], "https://example.com/other");
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let (channel, interceptor) = setup();
        let request = interceptor.intercept(paused("r1")).unwrap();
        channel.fail_with("session closed");

        let err = request.abort().await.unwrap_err();
        assert!(err.is_transport());
        // no retry: the request stays resolved and leaves the in-flight set
        assert!(request.is_resolved());
        assert!(interceptor.in_flight().is_empty());
        assert_eq!(interceptor.stats().transport_errors, 1);

        channel.recover();
        assert!(request.abort().await.unwrap_err().is_conflict());
        assert!(channel.is_empty());
    }

    #[tokio::test]
    async fn test_log_decisions_config() {
        let channel = Arc::new(RecordingChannel::new());
        let interceptor = Interceptor::with_config(
            channel.clone(),
            crate::intercept::InterceptConfig::for_blocking().log_decisions(true),
        )
        .unwrap();

        interceptor.intercept(paused("r1")).unwrap().abort().await.unwrap();
        assert_eq!(channel.commands()[0].params["errorReason"], "BlockedByClient");
    }
}
