//! Transport layer: fallback routing and the terminal transport node.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────┐   settings[0]   ┌──────────────────┐
//! │ ProtocolRoutingHandler │────────────────►│ TransportHandler │──► Transport (AMQP/TCP)
//! │                        │   on failure    ├──────────────────┤
//! │  Vec<TransportSettings>│────────────────►│ TransportHandler │──► Transport (AMQP/WS)
//! └────────────────────────┘   settings[1]   └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `handler` | [`Transport`] trait and [`TransportHandler`] |
//! | `routing` | [`ProtocolRoutingHandler`] fallback algorithm |
//! | `settings` | [`TransportSettings`] and [`TransportType`] |

// ============================================================================
// Submodules
// ============================================================================

/// Transport trait and terminal pipeline node.
pub mod handler;

/// Open-with-fallback across transport settings.
pub mod routing;

/// Transport configuration.
pub mod settings;

// ============================================================================
// Re-exports
// ============================================================================

pub use handler::{Transport, TransportConnector, TransportHandler};
pub use routing::ProtocolRoutingHandler;
pub use settings::{DEFAULT_RECEIVE_TIMEOUT, TransportSettings, TransportType};
