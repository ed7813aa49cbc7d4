// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Host side of interception: handler registration and event intake

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::FutureExt;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use super::config::InterceptConfig;
use super::dispatch;
use super::handler::RequestHandler;
use super::request::{HandlerChain, InterceptedRequest};
use super::stats::{InterceptMetrics, InterceptStats};
use crate::error::{Error, Result};
use crate::protocol::{CommandChannel, ProtocolEvent, RequestPaused, REQUEST_PAUSED};

/// State shared between an interceptor and the requests it created
pub(crate) struct Shared {
    pub(crate) channel: Arc<dyn CommandChannel>,
    pub(crate) config: InterceptConfig,
    pub(crate) metrics: InterceptMetrics,
    /// Request id -> time the request was paused
    in_flight: DashMap<String, Instant>,
}

impl Shared {
    fn admit(&self, request_id: &str) -> Result<()> {
        match self.in_flight.entry(request_id.to_string()) {
            Entry::Occupied(_) => Err(Error::DuplicateRequest(request_id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Instant::now());
                Ok(())
            }
        }
    }

    pub(crate) fn retire(&self, request_id: &str) {
        self.in_flight.remove(request_id);
    }
}

/// Request interceptor bound to one protocol session
///
/// Handlers run in registration order. Each paused request is bound to the
/// handler list as it was when the request arrived.
#[derive(Clone)]
pub struct Interceptor {
    shared: Arc<Shared>,
    handlers: Arc<RwLock<Vec<Arc<dyn RequestHandler>>>>,
}

impl Interceptor {
    /// Create an interceptor with default configuration
    pub fn new(channel: Arc<dyn CommandChannel>) -> Self {
        Self::build(channel, InterceptConfig::default())
    }

    /// Create an interceptor with custom configuration
    pub fn with_config(channel: Arc<dyn CommandChannel>, config: InterceptConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(channel, config))
    }

    fn build(channel: Arc<dyn CommandChannel>, config: InterceptConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                channel,
                config,
                metrics: InterceptMetrics::new(),
                in_flight: DashMap::new(),
            }),
            handlers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Append a handler to the chain
    pub fn register<H: RequestHandler + 'static>(&self, handler: H) {
        self.register_arc(Arc::new(handler));
    }

    /// Append a shared handler to the chain
    pub fn register_arc(&self, handler: Arc<dyn RequestHandler>) {
        tracing::debug!(handler = handler.name(), "Registering request handler");
        self.handlers.write().push(handler);
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Remove all handlers; requests already paused keep their chain
    pub fn clear_handlers(&self) {
        self.handlers.write().clear();
    }

    /// Interception configuration
    pub fn config(&self) -> &InterceptConfig {
        &self.shared.config
    }

    /// Turn a notification into a request bound to the current handler list
    ///
    /// The request is not dispatched; see [`on_request_paused`](Self::on_request_paused).
    pub fn intercept(&self, paused: RequestPaused) -> Result<InterceptedRequest> {
        self.shared.admit(&paused.request_id)?;
        self.shared.metrics.record_paused();

        let chain: HandlerChain = self.handlers.read().iter().cloned().collect();
        tracing::debug!(
            request_id = %paused.request_id,
            url = %paused.request.url,
            handlers = chain.len(),
            "Request paused"
        );

        Ok(InterceptedRequest::new(paused, chain, self.shared.clone()))
    }

    /// Intercept and run the handler chain
    pub async fn on_request_paused(&self, paused: RequestPaused) -> Result<()> {
        let request = self.intercept(paused)?;
        let result = dispatch::advance(&request).await;

        if result.is_err() {
            self.shared.metrics.record_dispatch_error();
        }
        result
    }

    /// Route a raw protocol event; returns whether it was a paused request
    pub async fn handle_event(&self, event: ProtocolEvent) -> Result<bool> {
        if event.method != REQUEST_PAUSED {
            return Ok(false);
        }

        let paused = RequestPaused::from_params(event.params)?;
        self.on_request_paused(paused).await?;
        Ok(true)
    }

    /// Dispatch on a background task, logging failures
    pub fn spawn(&self, paused: RequestPaused) -> JoinHandle<()> {
        tokio::spawn(self.clone().dispatch_logged(paused))
    }

    async fn dispatch_logged(self, paused: RequestPaused) {
        let request_id = paused.request_id.clone();
        if let Err(e) = self.on_request_paused(paused).await {
            tracing::error!(request_id = %request_id, error = %e, "Interception failed");
        }
    }

    /// Consume protocol events, dispatching each paused request on its own task
    ///
    /// Returns the number of requests dispatched once the stream closes and
    /// every dispatched chain has finished.
    pub async fn run(&self, mut events: mpsc::Receiver<ProtocolEvent>) -> usize {
        let mut tasks = JoinSet::new();
        let mut dispatched = 0;

        while let Some(event) = events.recv().await {
            if event.method != REQUEST_PAUSED {
                continue;
            }

            match RequestPaused::from_params(event.params) {
                Ok(paused) => {
                    dispatched += 1;
                    tasks.spawn(self.clone().dispatch_logged(paused));
                }
                Err(e) => tracing::warn!(error = %e, "Dropping malformed notification"),
            }

            // reap finished chains so the set stays small
            while let Some(Some(_)) = tasks.join_next().now_or_never() {}
        }

        while tasks.join_next().await.is_some() {}
        dispatched
    }

    /// Request ids still awaiting a terminal command
    pub fn in_flight(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .shared
            .in_flight
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Request ids paused for at least `older_than`
    ///
    /// No timeout is applied here; hosts use this to enforce their own.
    pub fn stalled(&self, older_than: Duration) -> Vec<String> {
        let mut ids: Vec<String> = self
            .shared
            .in_flight
            .iter()
            .filter(|entry| entry.value().elapsed() >= older_than)
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Counter snapshot
    pub fn stats(&self) -> InterceptStats {
        self.shared.metrics.snapshot()
    }
}
