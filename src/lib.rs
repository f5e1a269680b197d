//! devicelink - Connection pipeline for device-to-cloud clients.
//!
//! This library assembles the chain of handlers that sits between a device
//! client facade and its wire transports. It opens a connection through the
//! first transport configuration that works, falling back to the next one
//! when a transport fails for a transient reason.
//!
//! # Architecture
//!
//! The connection layer is a chain of decorators:
//!
//! - **Pipeline**: [`PipelineBuilder`] links continuation factories; each
//!   node builds its successor lazily, exactly once
//! - **Routing**: [`ProtocolRoutingHandler`] tries each
//!   [`TransportSettings`] in order and binds the first that opens
//! - **Transport**: [`TransportHandler`] adapts a concrete [`Transport`]
//!
//! Key design principles:
//!
//! - Only timeouts, socket failures and communication failures fall back
//! - Any other failure aborts the open immediately, unchanged
//! - Exhausting every transport yields a single [`Error::FallbackExhausted`]
//!
//! # Quick Start
//!
//! ```ignore
//! use devicelink::{
//!     DefaultDelegatingHandler, PipelineBuilder, PipelineContext,
//!     ProtocolRoutingHandler, Result, TransportHandler, TransportSettings,
//! };
//!
//! async fn connect(connector: devicelink::TransportConnector) -> Result<()> {
//!     let mut context = PipelineContext::new();
//!     context.set(TransportSettings::amqp_fallback_chain());
//!
//!     let head = PipelineBuilder::new()
//!         .with(DefaultDelegatingHandler::factory())
//!         .with(ProtocolRoutingHandler::factory())
//!         .with(TransportHandler::factory(connector))
//!         .build(&context)?;
//!
//!     head.open(true).await?;
//!     head.send_event(devicelink::Message::new("hello")).await?;
//!     head.close().await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types, retry classification and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`pipeline`] | Builder, context and delegating handler |
//! | [`protocol`] | Message type |
//! | [`transport`] | Routing handler, transport trait and settings |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for messages.
pub mod identifiers;

/// Handler chain construction and lazy binding.
///
/// Use [`PipelineBuilder`] to link factories into a chain.
pub mod pipeline;

/// Message types.
pub mod protocol;

/// Transport routing, settings and the terminal transport node.
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result, RetryPolicy};

// Identifier types
pub use identifiers::{LockToken, MessageId};

// Pipeline types
pub use pipeline::{
    ContinuationFactory, DefaultDelegatingHandler, DelegatingHandler, HandlerCore, HandlerRef,
    PipelineBuilder, PipelineContext,
};

// Protocol types
pub use protocol::Message;

// Transport types
pub use transport::{
    ProtocolRoutingHandler, Transport, TransportConnector, TransportHandler, TransportSettings,
    TransportType,
};
