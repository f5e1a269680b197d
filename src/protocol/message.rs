//! Message type carried through the pipeline.
//!
//! The pipeline passes messages through untouched. Encoding them onto a
//! wire is the concern of the transport behind [`TransportHandler`].
//!
//! [`TransportHandler`]: crate::transport::TransportHandler

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::identifiers::{LockToken, MessageId};

// ============================================================================
// Message
// ============================================================================

/// A device-to-cloud or cloud-to-device message.
///
/// # Format
///
/// ```json
/// {
///   "messageId": "uuid",
///   "lockToken": "opaque",
///   "body": [104, 105],
///   "properties": { "key": "value" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message identifier, assigned on creation.
    pub message_id: Option<MessageId>,

    /// Lock token issued by the transport for received messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_token: Option<LockToken>,

    /// Opaque payload.
    #[serde(default)]
    pub body: Vec<u8>,

    /// Application properties.
    #[serde(default)]
    pub properties: FxHashMap<String, String>,
}

impl Message {
    /// Creates a message with the given body and a fresh ID.
    #[inline]
    #[must_use]
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            message_id: Some(MessageId::generate()),
            lock_token: None,
            body: body.into(),
            properties: FxHashMap::default(),
        }
    }

    /// Adds an application property.
    #[inline]
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Attaches the lock token a transport issued on receive.
    #[inline]
    #[must_use]
    pub fn with_lock_token(mut self, token: LockToken) -> Self {
        self.lock_token = Some(token);
        self
    }

    /// Returns an application property.
    #[inline]
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Returns the body length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Returns `true` if the body is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
