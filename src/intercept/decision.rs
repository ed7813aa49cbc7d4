// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Terminal decisions and their command shaping

use std::fmt;

use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::config::InterceptConfig;
use crate::error::{Error, Result};
use crate::protocol::{
    ContinueRequestParams, FailRequestParams, FetchCommand, FulfillRequestParams, HeaderEntry,
};

const CONTENT_LENGTH: &str = "content-length";

/// Which decision resolved (or tried to resolve) a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Abort,
    Fail,
    Continue,
    Fulfill,
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecisionKind::Abort => "abort",
            DecisionKind::Fail => "fail",
            DecisionKind::Continue => "continue",
            DecisionKind::Fulfill => "fulfill",
        };
        f.write_str(name)
    }
}

/// Optional request overrides for `defer_to_browser`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContinueOverrides {
    pub url: Option<String>,
    pub method: Option<String>,
    pub headers: Option<Vec<HeaderEntry>>,
}

impl ContinueOverrides {
    /// No overrides: the request proceeds unmodified
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the URL
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Override the method
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Append a header to the override set
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Vec::new)
            .push(HeaderEntry::new(name, value));
        self
    }

    /// Replace the override header set
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = Some(
            headers
                .into_iter()
                .map(|(k, v)| HeaderEntry::new(k, v))
                .collect(),
        );
        self
    }

    /// Check if nothing is overridden
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.method.is_none() && self.headers.is_none()
    }

    /// Boundary validation of present fields
    pub fn validate(&self) -> Result<()> {
        if let Some(ref url) = self.url {
            url::Url::parse(url).map_err(|e| Error::invalid_override("url", e.to_string()))?;
        }

        if let Some(ref method) = self.method {
            if method.is_empty() {
                return Err(Error::invalid_override("method", "empty method"));
            }
            if let Some(c) = method.chars().find(|c| !is_token_char(*c)) {
                return Err(Error::invalid_override(
                    "method",
                    format!("invalid character {:?} in {:?}", c, method),
                ));
            }
        }

        if let Some(ref headers) = self.headers {
            if let Some(entry) = headers
                .iter()
                .find(|h| h.name.is_empty() || !h.name.chars().all(is_token_char))
            {
                return Err(Error::invalid_override(
                    "headers",
                    format!("invalid header name {:?}", entry.name),
                ));
            }
        }

        Ok(())
    }

    /// Shape into `Fetch.continueRequest` parameters
    pub fn to_params(&self, request_id: &str) -> ContinueRequestParams {
        ContinueRequestParams {
            request_id: request_id.to_string(),
            url: self.url.clone(),
            method: self.method.clone(),
            headers: self.headers.clone(),
        }
    }
}

/// RFC 9110 token characters
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

/// Synthetic response for `fulfill`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FulfillResponse {
    /// Status code; the configured default (200) when absent
    pub status: Option<u16>,
    /// Header pairs in emission order
    pub headers: Vec<(String, String)>,
    /// Raw body bytes; treated as empty when absent
    pub body: Option<Bytes>,
}

impl FulfillResponse {
    /// Create an empty response
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status code
    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// JSON body with a matching content type
    pub fn json(self, value: &serde_json::Value) -> Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(self.header("content-type", "application/json").body(body))
    }

    /// Shape into `Fetch.fulfillRequest` parameters
    ///
    /// Header names are lower-cased, values kept verbatim. A `content-length`
    /// entry is appended from the body size unless one was supplied.
    pub fn to_params(&self, request_id: &str, default_status: u16) -> FulfillRequestParams {
        let body: &[u8] = self.body.as_deref().unwrap_or_default();

        let mut has_length = false;
        let mut response_headers: Vec<HeaderEntry> = self
            .headers
            .iter()
            .map(|(name, value)| {
                let name = name.to_ascii_lowercase();
                has_length |= name == CONTENT_LENGTH;
                HeaderEntry::new(name, value.clone())
            })
            .collect();

        if !has_length {
            response_headers.push(HeaderEntry::new(CONTENT_LENGTH, body.len().to_string()));
        }

        FulfillRequestParams {
            request_id: request_id.to_string(),
            response_code: self.status.unwrap_or(default_status),
            response_headers,
            body: base64::engine::general_purpose::STANDARD.encode(body),
        }
    }
}

/// A terminal decision for one intercepted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Abort,
    Fail,
    Continue(ContinueOverrides),
    Fulfill(FulfillResponse),
}

impl Decision {
    /// Default decision when the handler chain is exhausted
    pub fn pass_through() -> Self {
        Decision::Continue(ContinueOverrides::default())
    }

    pub fn kind(&self) -> DecisionKind {
        match self {
            Decision::Abort => DecisionKind::Abort,
            Decision::Fail => DecisionKind::Fail,
            Decision::Continue(_) => DecisionKind::Continue,
            Decision::Fulfill(_) => DecisionKind::Fulfill,
        }
    }

    /// Validate and shape into the command the facade expects
    pub fn into_command(self, request_id: &str, config: &InterceptConfig) -> Result<FetchCommand> {
        let command = match self {
            // same command for both: the protocol has no separate abort
            Decision::Abort | Decision::Fail => FetchCommand::FailRequest(FailRequestParams {
                request_id: request_id.to_string(),
                error_reason: config.error_reason,
            }),
            Decision::Continue(overrides) => {
                overrides.validate()?;
                FetchCommand::ContinueRequest(overrides.to_params(request_id))
            }
            Decision::Fulfill(response) => FetchCommand::FulfillRequest(
                response.to_params(request_id, config.default_status),
            ),
        };
        Ok(command)
    }
}
