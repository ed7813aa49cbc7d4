// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Command facade over the host's protocol session

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Channel capable of sending protocol commands
///
/// Implemented by the host over its CDP session. The channel must accept
/// concurrent sends; commands are keyed by request id.
///
/// # Example
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use kalamari_intercept::protocol::CommandChannel;
/// use kalamari_intercept::Result;
/// use serde_json::Value;
///
/// struct Session;
///
/// #[async_trait]
/// impl CommandChannel for Session {
///     async fn send_command(&self, method: &str, params: Value) -> Result<Value> {
///         // write {"id", "method", "params"} to the websocket, await the reply
///         Ok(Value::Null)
///     }
/// }
/// ```
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Send a command and wait for its acknowledgment
    async fn send_command(&self, method: &str, params: Value) -> Result<Value>;
}

#[async_trait]
impl<C: CommandChannel + ?Sized> CommandChannel for Arc<C> {
    async fn send_command(&self, method: &str, params: Value) -> Result<Value> {
        (**self).send_command(method, params).await
    }
}

/// A command captured by [`RecordingChannel`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedCommand {
    pub method: String,
    pub params: Value,
}

impl RecordedCommand {
    /// `requestId` parameter, if present
    pub fn request_id(&self) -> Option<&str> {
        self.params.get("requestId").and_then(Value::as_str)
    }
}

/// In-memory channel that records every command it is asked to send
///
/// Used for dry runs and as the facade double in tests. Can be switched
/// into a failing mode to simulate a closed session.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    commands: Mutex<Vec<RecordedCommand>>,
    failure: RwLock<Option<String>>,
    closed: AtomicBool,
}

impl RecordingChannel {
    /// Create a new recording channel
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent send with a transport error
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.write() = Some(reason.into());
    }

    /// Accept sends again
    pub fn recover(&self) {
        *self.failure.write() = None;
        self.closed.store(false, Ordering::SeqCst);
    }

    /// Simulate the session going away; sends fail with `ChannelClosed`
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// All commands sent so far, in send order
    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.commands.lock().clone()
    }

    /// Commands scoped to one request id
    pub fn commands_for(&self, request_id: &str) -> Vec<RecordedCommand> {
        self.commands
            .lock()
            .iter()
            .filter(|c| c.request_id() == Some(request_id))
            .cloned()
            .collect()
    }

    /// Number of commands sent
    pub fn len(&self) -> usize {
        self.commands.lock().len()
    }

    /// Check if nothing has been sent
    pub fn is_empty(&self) -> bool {
        self.commands.lock().is_empty()
    }

    /// Drop recorded commands
    pub fn clear(&self) {
        self.commands.lock().clear();
    }
}

#[async_trait]
impl CommandChannel for RecordingChannel {
    async fn send_command(&self, method: &str, params: Value) -> Result<Value> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ChannelClosed);
        }

        let failure = self.failure.read().clone();
        if let Some(reason) = failure {
            let request_id = params
                .get("requestId")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(Error::transport(method, request_id, reason));
        }

        self.commands.lock().push(RecordedCommand {
            method: method.to_string(),
            params,
        });
        Ok(Value::Object(Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_records_commands() {
        let channel = RecordingChannel::new();
        channel
            .send_command("Fetch.failRequest", json!({"requestId": "a", "errorReason": "Failed"}))
            .await
            .unwrap();
        channel
            .send_command("Fetch.continueRequest", json!({"requestId": "b"}))
            .await
            .unwrap();

        assert_eq!(channel.len(), 2);
        assert_eq!(channel.commands_for("b")[0].method, "Fetch.continueRequest");
    }

    #[test]
    fn test_commands_for_unknown_id() {
        let channel = RecordingChannel::new();
        tokio_test::block_on(channel.send_command("Fetch.continueRequest", json!({"requestId": "x"})))
            .unwrap();

        assert!(channel.commands_for("y").is_empty());
        channel.clear();
        assert!(channel.is_empty());
    }

    #[tokio::test]
    async fn test_failure_mode() {
        let channel = Arc::new(RecordingChannel::new());
        channel.fail_with("session closed");

        let err = channel
            .send_command("Fetch.continueRequest", json!({"requestId": "c"}))
            .await
            .unwrap_err();

        assert!(err.is_transport());
        assert_eq!(err.request_id(), Some("c"));
        assert!(channel.is_empty());

        channel.recover();
        assert!(channel
            .send_command("Fetch.continueRequest", json!({"requestId": "c"}))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_closed_channel() {
        let channel = RecordingChannel::new();
        channel.close();

        let err = channel
            .send_command("Fetch.failRequest", json!({"requestId": "d"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChannelClosed));
        assert!(err.is_transport());
        assert!(channel.is_empty());

        channel.recover();
        assert!(channel
            .send_command("Fetch.failRequest", json!({"requestId": "d"}))
            .await
            .is_ok());
    }
}
