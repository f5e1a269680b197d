//! Transport configuration.
//!
//! A [`TransportSettings`] value names one way of reaching the cloud
//! endpoint. The protocol routing handler reads an ordered
//! `Vec<TransportSettings>` from the pipeline context; the first entry is
//! the preferred transport.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use devicelink::transport::{TransportSettings, TransportType};
//!
//! let routes = vec![
//!     TransportSettings::new(TransportType::MqttTcp)
//!         .with_default_receive_timeout(Duration::from_secs(10)),
//!     TransportSettings::new(TransportType::MqttWebSocket),
//! ];
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Receive timeout used when none is configured.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// TransportType
// ============================================================================

/// Protocol and framing of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    /// AMQP over TCP.
    AmqpTcp,
    /// AMQP over WebSocket.
    AmqpWebSocket,
    /// MQTT over TCP.
    MqttTcp,
    /// MQTT over WebSocket.
    MqttWebSocket,
    /// HTTP/1.1 polling.
    Http1,
}

impl TransportType {
    /// Returns the application protocol name.
    #[inline]
    #[must_use]
    pub const fn protocol(self) -> &'static str {
        match self {
            Self::AmqpTcp | Self::AmqpWebSocket => "amqp",
            Self::MqttTcp | Self::MqttWebSocket => "mqtt",
            Self::Http1 => "http",
        }
    }

    /// Returns `true` if the protocol is tunnelled over WebSocket.
    #[inline]
    #[must_use]
    pub const fn is_web_socket(self) -> bool {
        matches!(self, Self::AmqpWebSocket | Self::MqttWebSocket)
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AmqpTcp => "amqp_tcp",
            Self::AmqpWebSocket => "amqp_web_socket",
            Self::MqttTcp => "mqtt_tcp",
            Self::MqttWebSocket => "mqtt_web_socket",
            Self::Http1 => "http1",
        };
        f.write_str(name)
    }
}

// ============================================================================
// TransportSettings
// ============================================================================

/// Configuration of one transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportSettings {
    /// Protocol and framing.
    pub transport_type: TransportType,

    /// Timeout applied by `receive()` when the caller gives none.
    #[serde(default = "default_receive_timeout")]
    pub default_receive_timeout: Duration,
}

fn default_receive_timeout() -> Duration {
    DEFAULT_RECEIVE_TIMEOUT
}

// ============================================================================
// Constructors
// ============================================================================

impl TransportSettings {
    /// Creates settings for `transport_type` with the default receive
    /// timeout.
    #[inline]
    #[must_use]
    pub const fn new(transport_type: TransportType) -> Self {
        Self {
            transport_type,
            default_receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
        }
    }

    /// Sets the receive timeout used by `receive()`.
    #[inline]
    #[must_use]
    pub const fn with_default_receive_timeout(mut self, timeout: Duration) -> Self {
        self.default_receive_timeout = timeout;
        self
    }

    /// Builds an ordered fallback list from transport types.
    #[must_use]
    pub fn fallback_chain(types: impl IntoIterator<Item = TransportType>) -> Vec<Self> {
        types.into_iter().map(Self::new).collect()
    }

    /// AMQP over TCP, then AMQP over WebSocket.
    #[must_use]
    pub fn amqp_fallback_chain() -> Vec<Self> {
        Self::fallback_chain([TransportType::AmqpTcp, TransportType::AmqpWebSocket])
    }

    /// MQTT over TCP, then MQTT over WebSocket.
    #[must_use]
    pub fn mqtt_fallback_chain() -> Vec<Self> {
        Self::fallback_chain([TransportType::MqttTcp, TransportType::MqttWebSocket])
    }
}

// ============================================================================
// Validation
// ============================================================================

impl TransportSettings {
    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the receive timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.default_receive_timeout.is_zero() {
            return Err(Error::config(format!(
                "{} default receive timeout must be greater than zero",
                self.transport_type
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
