// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request handler trait and common handlers

use std::future::Future;

use async_trait::async_trait;
use regex::Regex;

use super::decision::{ContinueOverrides, FulfillResponse};
use super::request::InterceptedRequest;
use crate::error::Result;
use crate::protocol::{HeaderEntry, ResourceType};

/// Request handler - one link in the interception chain
///
/// A handler must eventually issue exactly one decision: a terminal one
/// (`abort`, `fail`, `defer_to_browser`, `fulfill`) or `continue_request`
/// to let the next handler decide. It may await other work first.
///
/// # Example
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use kalamari_intercept::intercept::{InterceptedRequest, RequestHandler};
/// use kalamari_intercept::Result;
///
/// struct BlockTrackers;
///
/// #[async_trait]
/// impl RequestHandler for BlockTrackers {
///     fn matches(&self, request: &InterceptedRequest) -> bool {
///         request.url().contains("/collect?")
///     }
///
///     async fn handle(&self, request: InterceptedRequest) -> Result<()> {
///         request.abort().await
///     }
/// }
/// ```
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Decide what happens to the request
    async fn handle(&self, request: InterceptedRequest) -> Result<()>;

    /// Filter - non-matching handlers are skipped as if they continued
    fn matches(&self, _request: &InterceptedRequest) -> bool {
        true
    }

    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Handler built from an async closure, see [`handler_fn`]
pub struct FnHandler<F> {
    f: F,
}

/// Adapt an async closure into a [`RequestHandler`]
///
/// ```rust,no_run
/// use kalamari_intercept::intercept::handler_fn;
///
/// let handler = handler_fn(|request| async move {
///     if request.method() == "DELETE" {
///         request.abort().await
///     } else {
///         request.continue_request().await
///     }
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(InterceptedRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> RequestHandler for FnHandler<F>
where
    F: Fn(InterceptedRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn handle(&self, request: InterceptedRequest) -> Result<()> {
        (self.f)(request).await
    }

    fn name(&self) -> &str {
        "handler_fn"
    }
}

/// Request logger - logs each request and passes it on
#[derive(Debug, Clone, Default)]
pub struct RequestLogger {
    /// Log request headers
    pub log_headers: bool,
    /// Only log URLs containing this substring
    pub url_filter: Option<String>,
}

impl RequestLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_headers(mut self, enabled: bool) -> Self {
        self.log_headers = enabled;
        self
    }

    pub fn url_filter(mut self, filter: impl Into<String>) -> Self {
        self.url_filter = Some(filter.into());
        self
    }
}

#[async_trait]
impl RequestHandler for RequestLogger {
    async fn handle(&self, request: InterceptedRequest) -> Result<()> {
        let wanted = self
            .url_filter
            .as_ref()
            .map_or(true, |filter| request.url().contains(filter.as_str()));

        if wanted {
            tracing::info!(
                request_id = %request.request_id(),
                method = %request.method(),
                url = %request.url(),
                resource_type = %request.resource_type(),
                "Paused request"
            );

            if self.log_headers {
                tracing::debug!(headers = ?request.headers(), "Request headers");
            }
        }

        request.continue_request().await
    }

    fn name(&self) -> &str {
        "request_logger"
    }
}

/// URL blocker - aborts requests by URL pattern or resource type
#[derive(Debug, Clone, Default)]
pub struct UrlBlocker {
    patterns: Vec<Regex>,
    resource_types: Vec<ResourceType>,
    static_assets: bool,
}

impl UrlBlocker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block URLs matching a regular expression
    pub fn pattern(mut self, pattern: &str) -> Result<Self> {
        self.patterns.push(Regex::new(pattern)?);
        Ok(self)
    }

    /// Block a resource type
    pub fn resource(mut self, resource_type: ResourceType) -> Self {
        if !self.resource_types.contains(&resource_type) {
            self.resource_types.push(resource_type);
        }
        self
    }

    /// Block images, fonts, media and stylesheets
    pub fn static_assets(mut self) -> Self {
        self.static_assets = true;
        self
    }

    /// Check if a request would be blocked
    pub fn is_blocked(&self, request: &InterceptedRequest) -> bool {
        let kind = request.resource_kind();
        (self.static_assets && kind.is_static_asset())
            || self.resource_types.contains(&kind)
            || self.patterns.iter().any(|p| p.is_match(request.url()))
    }
}

#[async_trait]
impl RequestHandler for UrlBlocker {
    fn matches(&self, request: &InterceptedRequest) -> bool {
        self.is_blocked(request)
    }

    async fn handle(&self, request: InterceptedRequest) -> Result<()> {
        tracing::debug!(url = %request.url(), "Blocking request");
        request.abort().await
    }

    fn name(&self) -> &str {
        "url_blocker"
    }
}

/// Header injector - sends matching requests on with extra headers
///
/// Terminal: matching requests are deferred to the browser and do not reach
/// later handlers.
#[derive(Debug, Clone, Default)]
pub struct HeaderInjector {
    headers: Vec<HeaderEntry>,
    domains: Vec<String>,
}

impl HeaderInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bearer token
    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    /// Add basic auth
    pub fn basic_auth(self, username: &str, password: &str) -> Self {
        let encoded = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            format!("{}:{}", username, password),
        );
        self.header("Authorization", format!("Basic {}", encoded))
    }

    /// Add custom header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(HeaderEntry::new(name, value));
        self
    }

    /// Restrict to these domains and their subdomains
    pub fn for_domains(mut self, domains: Vec<String>) -> Self {
        self.domains = domains;
        self
    }

    /// Request headers with injected ones replacing same-named originals
    pub fn merged_headers(&self, request: &InterceptedRequest) -> Vec<HeaderEntry> {
        let mut merged: Vec<HeaderEntry> = request
            .headers()
            .iter()
            .filter(|(name, _)| {
                !self
                    .headers
                    .iter()
                    .any(|h| h.name.eq_ignore_ascii_case(name))
            })
            .map(|(name, value)| HeaderEntry::new(name.clone(), value.clone()))
            .collect();
        merged.sort_by(|a, b| a.name.cmp(&b.name));
        merged.extend(self.headers.iter().cloned());
        merged
    }
}

#[async_trait]
impl RequestHandler for HeaderInjector {
    fn matches(&self, request: &InterceptedRequest) -> bool {
        if self.domains.is_empty() {
            return true;
        }

        request
            .host()
            .map(|host| self.domains.iter().any(|d| host_in_domain(&host, d)))
            .unwrap_or(false)
    }

    async fn handle(&self, request: InterceptedRequest) -> Result<()> {
        let headers = self.merged_headers(&request);
        let overrides = ContinueOverrides {
            headers: Some(headers),
            ..Default::default()
        };
        request.defer_to_browser(overrides).await
    }

    fn name(&self) -> &str {
        "header_injector"
    }
}

/// Exact host or a subdomain of it
fn host_in_domain(host: &str, domain: &str) -> bool {
    let domain = domain.trim_start_matches('.');
    if domain.is_empty() {
        return false;
    }
    if host.eq_ignore_ascii_case(domain) {
        return true;
    }
    match host.len().checked_sub(domain.len() + 1) {
        Some(dot) => {
            host.as_bytes()[dot] == b'.'
                && host
                    .get(dot + 1..)
                    .map_or(false, |suffix| suffix.eq_ignore_ascii_case(domain))
        }
        None => false,
    }
}

/// Mock responder - answers matching URLs with canned responses
#[derive(Debug, Clone, Default)]
pub struct MockResponder {
    routes: Vec<(Regex, FulfillResponse)>,
}

impl MockResponder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer URLs matching `pattern` with `response`; first match wins
    pub fn route(mut self, pattern: &str, response: FulfillResponse) -> Result<Self> {
        self.routes.push((Regex::new(pattern)?, response));
        Ok(self)
    }

    fn lookup(&self, url: &str) -> Option<&FulfillResponse> {
        self.routes
            .iter()
            .find(|(pattern, _)| pattern.is_match(url))
            .map(|(_, response)| response)
    }
}

#[async_trait]
impl RequestHandler for MockResponder {
    fn matches(&self, request: &InterceptedRequest) -> bool {
        self.lookup(request.url()).is_some()
    }

    async fn handle(&self, request: InterceptedRequest) -> Result<()> {
        match self.lookup(request.url()) {
            Some(response) => request.fulfill(response.clone()).await,
            None => request.continue_request().await,
        }
    }

    fn name(&self) -> &str {
        "mock_responder"
    }
}
