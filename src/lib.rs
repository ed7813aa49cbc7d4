// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # Kalamari Intercept - CDP request interception
//!
//! Turns `Fetch.requestPaused` notifications into inspectable requests,
//! routes each through an ordered chain of handlers, and sends exactly one
//! terminal command per request back over the protocol session.
//!
//! ## Features
//!
//! - Ordered handler chains, snapshotted per request
//! - One-shot decisions: abort, fail, defer to browser, fulfill
//! - Protocol-exact fulfill shaping: lower-cased headers, computed
//!   content-length, base64 bodies
//! - Built-in handlers: URL blocking, header injection, mock responses, logging
//! - In-flight tracking and counters for host-side timeout policy
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use kalamari_intercept::{FulfillResponse, Interceptor, RecordingChannel, RequestPaused, handler_fn};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let channel = Arc::new(RecordingChannel::new());
//!     let interceptor = Interceptor::new(channel.clone());
//!
//!     interceptor.register(handler_fn(|request| async move {
//!         if request.url().ends_with("/health") {
//!             request.fulfill(FulfillResponse::new().body("ok")).await
//!         } else {
//!             request.continue_request().await
//!         }
//!     }));
//!
//!     let paused = RequestPaused::new("interception-1", "GET", "https://example.com/health", "Fetch");
//!     interceptor.on_request_paused(paused).await?;
//!
//!     for command in channel.commands() {
//!         println!("{} {}", command.method, command.params);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod intercept;
pub mod protocol;

// Errors
pub use error::{Error, ErrorContext, Result};

// Interception
pub use intercept::{
    ContinueOverrides, Decision, DecisionKind, FulfillResponse, InterceptConfig,
    InterceptStats, InterceptedRequest, Interceptor,
};
pub use intercept::{
    handler_fn, HeaderInjector, MockResponder, RequestHandler, RequestLogger, UrlBlocker,
};

// Protocol
pub use protocol::{CommandChannel, RecordedCommand, RecordingChannel};
pub use protocol::{ErrorReason, FetchCommand, HeaderEntry, ProtocolEvent, RequestPaused, ResourceType};

/// Kalamari Intercept version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
