// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! CDP Fetch-domain wire shapes and the command facade
//!
//! Inbound `Fetch.requestPaused` notifications, outbound fail/continue/fulfill
//! commands, and the channel trait the host implements over its session.

mod channel;
mod command;
mod notification;

pub use channel::{CommandChannel, RecordedCommand, RecordingChannel};
pub use command::{
    ContinueRequestParams, ErrorReason, FailRequestParams, FetchCommand, FulfillRequestParams,
    HeaderEntry,
};
pub use notification::{ProtocolEvent, RequestDescriptor, RequestPaused, ResourceType};

/// Notification announcing a paused request
pub const REQUEST_PAUSED: &str = "Fetch.requestPaused";
/// Command failing a paused request
pub const FAIL_REQUEST: &str = "Fetch.failRequest";
/// Command continuing a paused request, optionally modified
pub const CONTINUE_REQUEST: &str = "Fetch.continueRequest";
/// Command answering a paused request with a synthetic response
pub const FULFILL_REQUEST: &str = "Fetch.fulfillRequest";
