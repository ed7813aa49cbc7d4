// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request interception
//!
//! Paused requests flow through an ordered handler chain until one handler
//! issues a terminal decision; that decision becomes exactly one command.

mod config;
mod decision;
mod dispatch;
mod handler;
mod interceptor;
mod request;
mod stats;

pub use config::InterceptConfig;
pub use decision::{ContinueOverrides, Decision, DecisionKind, FulfillResponse};
pub use handler::{
    handler_fn, FnHandler, HeaderInjector, MockResponder, RequestHandler, RequestLogger,
    UrlBlocker,
};
pub use interceptor::Interceptor;
pub use request::InterceptedRequest;
pub use stats::{InterceptMetrics, InterceptStats};
