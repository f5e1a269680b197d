//! Handler pipeline construction and lazy binding.
//!
//! A pipeline is a singly linked chain of [`DelegatingHandler`] nodes. The
//! [`PipelineBuilder`] creates the head; each node creates its successor on
//! first use through its [`ContinuationFactory`].
//!
//! # Architecture
//!
//! ```text
//! PipelineBuilder::build(context)
//!        │
//!        ▼
//! ┌──────────────┐  lazy   ┌──────────────────────┐  per open  ┌──────────────────┐
//! │ head handler │───────►│ ProtocolRoutingHandler│──────────►│ TransportHandler │
//! └──────────────┘         └──────────────────────┘            └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Links factories into a chain |
//! | `context` | Typed configuration bag |
//! | `handler` | Delegating handler trait and lazy-resolution core |

// ============================================================================
// Submodules
// ============================================================================

/// Chain construction from ordered factories.
pub mod builder;

/// Typed key/value context.
pub mod context;

/// Delegating handler trait, shared node state and pass-through node.
pub mod handler;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::PipelineBuilder;
pub use context::PipelineContext;
pub use handler::{
    ContinuationFactory, DefaultDelegatingHandler, DelegatingHandler, HandlerCore, HandlerRef,
};
