// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Outbound Fetch-domain commands

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CONTINUE_REQUEST, FAIL_REQUEST, FULFILL_REQUEST};
use crate::error::Result;

/// Header entry (CDP `Fetch.HeaderEntry`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

impl HeaderEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Network error reason token (CDP `Network.ErrorReason`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorReason {
    #[default]
    Failed,
    Aborted,
    TimedOut,
    AccessDenied,
    ConnectionClosed,
    ConnectionReset,
    ConnectionRefused,
    ConnectionAborted,
    ConnectionFailed,
    NameNotResolved,
    InternetDisconnected,
    AddressUnreachable,
    BlockedByClient,
    BlockedByResponse,
}

impl ErrorReason {
    /// Protocol token for this reason
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorReason::Failed => "Failed",
            ErrorReason::Aborted => "Aborted",
            ErrorReason::TimedOut => "TimedOut",
            ErrorReason::AccessDenied => "AccessDenied",
            ErrorReason::ConnectionClosed => "ConnectionClosed",
            ErrorReason::ConnectionReset => "ConnectionReset",
            ErrorReason::ConnectionRefused => "ConnectionRefused",
            ErrorReason::ConnectionAborted => "ConnectionAborted",
            ErrorReason::ConnectionFailed => "ConnectionFailed",
            ErrorReason::NameNotResolved => "NameNotResolved",
            ErrorReason::InternetDisconnected => "InternetDisconnected",
            ErrorReason::AddressUnreachable => "AddressUnreachable",
            ErrorReason::BlockedByClient => "BlockedByClient",
            ErrorReason::BlockedByResponse => "BlockedByResponse",
        }
    }
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Fetch.failRequest` parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailRequestParams {
    pub request_id: String,
    pub error_reason: ErrorReason,
}

/// `Fetch.continueRequest` parameters; absent fields are not serialized
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueRequestParams {
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<HeaderEntry>>,
}

/// `Fetch.fulfillRequest` parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillRequestParams {
    pub request_id: String,
    pub response_code: u16,
    pub response_headers: Vec<HeaderEntry>,
    /// Base64-encoded response body
    pub body: String,
}

/// A fully-shaped command ready for the facade
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCommand {
    FailRequest(FailRequestParams),
    ContinueRequest(ContinueRequestParams),
    FulfillRequest(FulfillRequestParams),
}

impl FetchCommand {
    /// Protocol method name
    pub fn method(&self) -> &'static str {
        match self {
            FetchCommand::FailRequest(_) => FAIL_REQUEST,
            FetchCommand::ContinueRequest(_) => CONTINUE_REQUEST,
            FetchCommand::FulfillRequest(_) => FULFILL_REQUEST,
        }
    }

    /// Request id the command is scoped to
    pub fn request_id(&self) -> &str {
        match self {
            FetchCommand::FailRequest(p) => &p.request_id,
            FetchCommand::ContinueRequest(p) => &p.request_id,
            FetchCommand::FulfillRequest(p) => &p.request_id,
        }
    }

    /// Serialize parameters to the JSON object sent over the channel
    pub fn params(&self) -> Result<Value> {
        let value = match self {
            FetchCommand::FailRequest(p) => serde_json::to_value(p)?,
            FetchCommand::ContinueRequest(p) => serde_json::to_value(p)?,
            FetchCommand::FulfillRequest(p) => serde_json::to_value(p)?,
        };
        Ok(value)
    }
}
